//! # Assignment Worker
//!
//! Supervised polling loop over the assignment-trigger queue. Each iteration
//! pops one entry, normalizes it, checks the jurisdiction against the
//! configured allow-list, and triggers assignment through an
//! [`AssignmentInvoker`].
//!
//! | Outcome                    | Action                                  |
//! |----------------------------|-----------------------------------------|
//! | queue empty                | pause for the idle interval             |
//! | malformed / no jurisdiction| dead-letter the raw entry, continue     |
//! | outside the allow-list     | log and drop, continue                  |
//! | invocation failed          | requeue the raw entry, pause (cooldown) |
//! | assigned                   | continue immediately                    |
//! | queue error                | pause for the error backoff             |
//!
//! Several workers may share the same queues; the queue's atomic pop hands
//! each entry to exactly one of them.

use super::invoker::AssignmentInvoker;
use super::trigger::TriggerRecord;
use crate::config::PipelineConfig;
use crate::lifecycle::{LoopControl, LoopState};
use crate::logging::log_error;
use crate::messaging::ListQueue;
use crate::models::same_jurisdiction;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub assignment_queue: String,
    pub dead_letter_queue: String,
    pub allowed_jurisdictions: Vec<String>,
    /// Blocking pop wait; `None` polls without blocking
    pub pop_wait: Option<Duration>,
    pub idle_interval: Duration,
    pub failure_cooldown: Duration,
    pub error_backoff: Duration,
}

impl WorkerSettings {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        let pop_wait = config.queue.blocking_pop_timeout();
        Self {
            assignment_queue: config.queue.assignment_queue.clone(),
            dead_letter_queue: config.queue.dead_letter_queue.clone(),
            allowed_jurisdictions: config.worker.allowed_jurisdictions.clone(),
            pop_wait: (!pop_wait.is_zero()).then_some(pop_wait),
            idle_interval: config.worker.idle_interval(),
            failure_cooldown: config.worker.failure_cooldown(),
            error_backoff: config.worker.error_backoff(),
        }
    }

    pub fn is_allowed(&self, jurisdiction: &str) -> bool {
        self.allowed_jurisdictions
            .iter()
            .any(|allowed| same_jurisdiction(allowed, jurisdiction))
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from_pipeline(&PipelineConfig::default())
    }
}

/// Result of one loop iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    Idle,
    Assigned,
    DeadLettered,
    Dropped { jurisdiction: String },
    Requeued,
    Error(String),
}

/// Running totals, readable while the loop runs
#[derive(Debug, Default)]
pub struct WorkerStats {
    assigned: AtomicU64,
    dead_lettered: AtomicU64,
    dropped: AtomicU64,
    requeued: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStatsSnapshot {
    pub assigned: u64,
    pub dead_lettered: u64,
    pub dropped: u64,
    pub requeued: u64,
    pub errors: u64,
}

impl WorkerStats {
    fn record(&self, outcome: &IterationOutcome) {
        let counter = match outcome {
            IterationOutcome::Idle => return,
            IterationOutcome::Assigned => &self.assigned,
            IterationOutcome::DeadLettered => &self.dead_lettered,
            IterationOutcome::Dropped { .. } => &self.dropped,
            IterationOutcome::Requeued => &self.requeued,
            IterationOutcome::Error(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            assigned: self.assigned.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

pub struct AssignmentWorker {
    queue: Arc<dyn ListQueue>,
    invoker: Arc<dyn AssignmentInvoker>,
    settings: WorkerSettings,
    control: LoopControl,
    stats: WorkerStats,
}

impl std::fmt::Debug for AssignmentWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentWorker")
            .field("settings", &self.settings)
            .field("state", &self.control.state())
            .finish()
    }
}

impl AssignmentWorker {
    pub fn new(
        queue: Arc<dyn ListQueue>,
        invoker: Arc<dyn AssignmentInvoker>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            queue,
            invoker,
            settings,
            control: LoopControl::new(),
            stats: WorkerStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.control.state()
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    pub fn stats(&self) -> WorkerStatsSnapshot {
        self.stats.snapshot()
    }

    /// Spawn the loop on the runtime; `None` if it is already running
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.control.try_start() {
            debug!("Assignment worker already running");
            return None;
        }
        let worker = Arc::clone(self);
        Some(tokio::spawn(async move { worker.run_loop().await }))
    }

    /// Run the loop on the current task until stopped; no-op if already running
    pub async fn run(&self) {
        if !self.control.try_start() {
            debug!("Assignment worker already running");
            return;
        }
        self.run_loop().await;
    }

    /// Ask the loop to exit at its next boundary
    ///
    /// An in-flight invocation is allowed to finish.
    pub fn stop(&self) {
        if self.control.request_stop() {
            info!("🛑 Assignment worker stopping");
        }
    }

    /// Resolve once the loop has exited
    pub async fn stopped(&self) {
        self.control.stopped().await
    }

    async fn run_loop(&self) {
        info!(
            queue = %self.settings.assignment_queue,
            allowed = ?self.settings.allowed_jurisdictions,
            "🚀 Assignment worker started"
        );

        while self.control.is_running() {
            let outcome = self.run_iteration().await;
            self.stats.record(&outcome);

            let pause = match &outcome {
                IterationOutcome::Idle => Some(self.settings.idle_interval),
                IterationOutcome::Requeued => Some(self.settings.failure_cooldown),
                IterationOutcome::Error(_) => Some(self.settings.error_backoff),
                IterationOutcome::Assigned
                | IterationOutcome::DeadLettered
                | IterationOutcome::Dropped { .. } => None,
            };

            if let Some(duration) = pause {
                if !self.control.pause(duration).await {
                    break;
                }
            }
        }

        self.control.mark_stopped();
        info!(stats = ?self.stats.snapshot(), "Assignment worker stopped");
    }

    /// Handle at most one trigger
    pub async fn run_iteration(&self) -> IterationOutcome {
        let list = self.settings.assignment_queue.as_str();

        let raw = match self.queue.pop(list, self.settings.pop_wait).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return IterationOutcome::Idle,
            Err(e) => {
                warn!(error = %e, "Failed to poll assignment queue");
                return IterationOutcome::Error(e.to_string());
            }
        };

        let record = match TriggerRecord::normalize(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Malformed assignment trigger");
                return self.dead_letter(&raw).await;
            }
        };

        let Some(jurisdiction) = record.jurisdiction else {
            warn!(complaint_id = ?record.complaint_id, "Assignment trigger has no jurisdiction");
            return self.dead_letter(&raw).await;
        };

        if !self.settings.is_allowed(&jurisdiction) {
            info!(
                complaint_id = ?record.complaint_id,
                jurisdiction = %jurisdiction,
                "Jurisdiction outside service area, dropping trigger"
            );
            return IterationOutcome::Dropped { jurisdiction };
        }

        match self.invoker.invoke(&jurisdiction).await {
            Ok(result) => {
                debug!(complaint_id = ?result.complaint_id, "Assignment triggered");
                IterationOutcome::Assigned
            }
            Err(e) => {
                warn!(
                    complaint_id = ?record.complaint_id,
                    jurisdiction = %jurisdiction,
                    error = %e,
                    "Assignment failed, requeueing trigger"
                );
                match self.queue.push(list, &raw).await {
                    Ok(_) => IterationOutcome::Requeued,
                    Err(qe) => {
                        log_error("worker", "requeue", &qe.to_string(), Some(&raw));
                        IterationOutcome::Error(qe.to_string())
                    }
                }
            }
        }
    }

    async fn dead_letter(&self, raw: &str) -> IterationOutcome {
        match self.queue.push(&self.settings.dead_letter_queue, raw).await {
            Ok(_) => IterationOutcome::DeadLettered,
            Err(e) => {
                error!(error = %e, "Failed to dead-letter assignment trigger");
                log_error("worker", "dead_letter", &e.to_string(), Some(raw));
                IterationOutcome::Error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_is_case_insensitive() {
        let settings = WorkerSettings::default();
        assert!(settings.is_allowed("Ranchi"));
        assert!(settings.is_allowed("DHANBAD"));
        assert!(settings.is_allowed(" jamshedpur "));
        assert!(!settings.is_allowed("Bokaro"));
    }

    #[test]
    fn test_default_timings() {
        let settings = WorkerSettings::default();
        assert_eq!(settings.idle_interval, Duration::from_secs(10));
        assert_eq!(settings.failure_cooldown, Duration::from_secs(30));
        assert_eq!(settings.error_backoff, Duration::from_secs(5));
        assert_eq!(settings.pop_wait, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_stats_skip_idle() {
        let stats = WorkerStats::default();
        stats.record(&IterationOutcome::Idle);
        stats.record(&IterationOutcome::Assigned);
        stats.record(&IterationOutcome::Requeued);
        assert_eq!(
            stats.snapshot(),
            WorkerStatsSnapshot {
                assigned: 1,
                requeued: 1,
                ..WorkerStatsSnapshot::default()
            }
        );
    }
}
