//! # Loop Lifecycle
//!
//! Explicit per-instance run state for the polling loops (assignment worker,
//! ingestion poller). State lives in a `tokio::sync::watch` channel so that
//! pauses between iterations end as soon as a stop is requested, while an
//! in-flight iteration always runs to completion.

use std::fmt;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
    /// Stop requested; the loop exits at its next boundary
    Stopping,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Running => f.write_str("running"),
            Self::Stopping => f.write_str("stopping"),
        }
    }
}

#[derive(Debug)]
pub struct LoopControl {
    state: watch::Sender<LoopState>,
}

impl Default for LoopControl {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopControl {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LoopState::Stopped);
        Self { state }
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// Move `Stopped -> Running`; false when the loop is already active
    pub fn try_start(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == LoopState::Stopped {
                *state = LoopState::Running;
                true
            } else {
                false
            }
        })
    }

    /// Move `Running -> Stopping`; false when there was nothing to stop
    pub fn request_stop(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == LoopState::Running {
                *state = LoopState::Stopping;
                true
            } else {
                false
            }
        })
    }

    /// Called by the loop itself on exit
    pub fn mark_stopped(&self) {
        self.state.send_replace(LoopState::Stopped);
    }

    /// Sleep for `duration` unless a stop arrives first
    ///
    /// Returns whether the loop should keep going.
    pub async fn pause(&self, duration: Duration) -> bool {
        let mut changes = self.state.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_running(),
            _ = changes.wait_for(|state| *state != LoopState::Running) => false,
        }
    }

    /// Resolve once the loop has fully stopped
    pub async fn stopped(&self) {
        let mut changes = self.state.subscribe();
        let _ = changes.wait_for(|state| *state == LoopState::Stopped).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let control = LoopControl::new();
        assert!(control.try_start());
        assert!(!control.try_start());
        assert_eq!(control.state(), LoopState::Running);

        assert!(control.request_stop());
        assert!(!control.request_stop());
        assert_eq!(control.state(), LoopState::Stopping);

        // Cannot restart until the loop acknowledges the stop
        assert!(!control.try_start());
        control.mark_stopped();
        assert!(control.try_start());
    }

    #[tokio::test]
    async fn test_pause_ends_early_on_stop() {
        let control = Arc::new(LoopControl::new());
        control.try_start();

        let stopper = Arc::clone(&control);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.request_stop();
        });

        let started = Instant::now();
        let keep_going = control.pause(Duration::from_secs(30)).await;
        assert!(!keep_going);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_pause_completes_while_running() {
        let control = LoopControl::new();
        control.try_start();
        assert!(control.pause(Duration::from_millis(5)).await);
    }
}
