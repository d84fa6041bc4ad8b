//! # Ingestion Poller
//!
//! Periodic driver for [`ComplaintProcessor::process_next`]. While entries keep
//! reaching a terminal outcome the poller drains without pausing; an empty
//! queue or a retry-later outcome waits one poll interval.

use super::processor::{ComplaintProcessor, Disposition};
use crate::lifecycle::{LoopControl, LoopState};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug)]
pub struct IngestionPoller {
    processor: Arc<ComplaintProcessor>,
    control: LoopControl,
    poll_interval: Duration,
}

impl IngestionPoller {
    pub fn new(processor: Arc<ComplaintProcessor>, poll_interval: Duration) -> Self {
        Self {
            processor,
            control: LoopControl::new(),
            poll_interval,
        }
    }

    pub fn state(&self) -> LoopState {
        self.control.state()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Spawn the polling loop; `None` if it is already running
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.control.try_start() {
            debug!("Ingestion poller already running");
            return None;
        }

        let poller = Arc::clone(self);
        Some(tokio::spawn(async move { poller.run_loop().await }))
    }

    /// Request the loop to exit at its next boundary
    pub fn stop(&self) {
        if self.control.request_stop() {
            info!("🛑 Ingestion poller stopping");
        }
    }

    pub async fn stopped(&self) {
        self.control.stopped().await
    }

    async fn run_loop(&self) {
        info!(
            queue = %self.processor.config().registration_queue,
            interval_ms = self.poll_interval.as_millis() as u64,
            "📥 Ingestion poller started"
        );

        while self.control.is_running() {
            let outcome = self.processor.process_next().await;
            let drained = outcome.disposition.is_terminal();

            if outcome.disposition != Disposition::Empty {
                debug!(
                    disposition = ?outcome.disposition,
                    processed = outcome.processed,
                    error = outcome.error.as_deref(),
                    "Ingestion poll completed"
                );
            }

            if !drained && !self.control.pause(self.poll_interval).await {
                break;
            }
        }

        self.control.mark_stopped();
        info!("Ingestion poller stopped");
    }
}
