//! # In-Memory List Queue
//!
//! Process-local implementation of [`ListQueue`] for testing and development.
//! Lists are `VecDeque`s keyed by name; blocking pops park on a shared
//! [`Notify`] until a push arrives or the wait expires.
//!
//! Connectivity failures can be injected to exercise callers' recovery paths.

use super::errors::{QueueError, QueueResult};
use super::ListQueue;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug)]
pub struct InMemoryListQueue {
    lists: DashMap<String, VecDeque<String>>,
    pushed: Notify,
    ready: AtomicBool,
    injected_failures: AtomicU32,
    injected_remove_failures: AtomicU32,
}

impl Default for InMemoryListQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryListQueue {
    /// Create a ready, empty queue
    pub fn new() -> Self {
        Self {
            lists: DashMap::new(),
            pushed: Notify::new(),
            ready: AtomicBool::new(true),
            injected_failures: AtomicU32::new(0),
            injected_remove_failures: AtomicU32::new(0),
        }
    }

    /// Toggle readiness as reported by [`ListQueue::is_ready`]
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// Fail the next `count` operations with a connectivity error
    pub fn fail_next_operations(&self, count: u32) {
        self.injected_failures.store(count, Ordering::Release);
    }

    /// Fail only the next `count` removes, leaving other operations working
    pub fn fail_next_removes(&self, count: u32) {
        self.injected_remove_failures.store(count, Ordering::Release);
    }

    /// Snapshot of a list, head first
    pub fn items(&self, list: &str) -> Vec<String> {
        self.lists
            .get(list)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn check_connectivity(&self) -> QueueResult<()> {
        let consumed = self
            .injected_failures
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match consumed {
            Ok(_) => Err(QueueError::connectivity("injected connectivity failure")),
            Err(_) => Ok(()),
        }
    }

    fn try_pop(&self, list: &str) -> Option<String> {
        self.lists.get_mut(list).and_then(|mut entries| entries.pop_front())
    }
}

#[async_trait]
impl ListQueue for InMemoryListQueue {
    async fn ensure_connected(&self) -> QueueResult<()> {
        if self.ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(QueueError::connectivity("in-memory queue marked unready"))
        }
    }

    async fn push(&self, list: &str, payload: &str) -> QueueResult<u64> {
        self.check_connectivity()?;
        let len = {
            let mut entries = self.lists.entry(list.to_string()).or_default();
            entries.push_back(payload.to_string());
            entries.len() as u64
        };
        self.pushed.notify_waiters();
        Ok(len)
    }

    async fn peek(&self, list: &str) -> QueueResult<Option<String>> {
        self.check_connectivity()?;
        Ok(self
            .lists
            .get(list)
            .and_then(|entries| entries.front().cloned()))
    }

    async fn pop(&self, list: &str, wait: Option<Duration>) -> QueueResult<Option<String>> {
        self.check_connectivity()?;

        let Some(wait) = wait.filter(|w| !w.is_zero()) else {
            return Ok(self.try_pop(list));
        };

        let deadline = Instant::now() + wait;
        loop {
            // Register interest before checking so a concurrent push is not missed
            let notified = self.pushed.notified();
            if let Some(entry) = self.try_pop(list) {
                return Ok(Some(entry));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(self.try_pop(list));
            }
        }
    }

    async fn remove(&self, list: &str, payload: &str) -> QueueResult<u64> {
        self.check_connectivity()?;
        if self
            .injected_remove_failures
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(QueueError::connectivity("injected remove failure"));
        }
        let Some(mut entries) = self.lists.get_mut(list) else {
            return Ok(0);
        };
        match entries.iter().position(|entry| entry == payload) {
            Some(index) => {
                entries.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn contains(&self, list: &str, payload: &str) -> QueueResult<bool> {
        self.check_connectivity()?;
        Ok(self
            .lists
            .get(list)
            .is_some_and(|entries| entries.iter().any(|entry| entry == payload)))
    }

    async fn len(&self, list: &str) -> QueueResult<u64> {
        self.check_connectivity()?;
        Ok(self.lists.get(list).map(|e| e.len() as u64).unwrap_or(0))
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
