//! # Assignment Poller
//!
//! Periodic driver for [`AssignmentEngine::auto_assign_one`], independent of
//! trigger entries. Each wake-up drains the Processed Queue until it is empty
//! or a reference goes back on the queue after a transient store error, then
//! sleeps one poll interval.

use super::engine::AssignmentEngine;
use crate::lifecycle::{LoopControl, LoopState};
use crate::models::{AssignmentResult, FailureCategory};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug)]
pub struct AssignmentPoller {
    engine: Arc<AssignmentEngine>,
    control: LoopControl,
    poll_interval: Duration,
}

impl AssignmentPoller {
    pub fn new(engine: Arc<AssignmentEngine>, poll_interval: Duration) -> Self {
        Self {
            engine,
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
            debug!("Assignment poller already running");
            return None;
        }

        let poller = Arc::clone(self);
        Some(tokio::spawn(async move { poller.run_loop().await }))
    }

    /// Request the loop to exit at its next boundary
    pub fn stop(&self) {
        if self.control.request_stop() {
            info!("🛑 Assignment poller stopping");
        }
    }

    pub async fn stopped(&self) {
        self.control.stopped().await
    }

    async fn run_loop(&self) {
        info!(
            queue = %self.engine.config().processed_queue,
            interval_ms = self.poll_interval.as_millis() as u64,
            "🎯 Assignment poller started"
        );

        while self.control.is_running() {
            let result = self.engine.auto_assign_one().await;
            if result.success {
                info!(
                    complaint_id = result.complaint_id.as_deref(),
                    message = %result.message,
                    "Complaint auto-assigned"
                );
            }

            if !keeps_draining(&result) && !self.control.pause(self.poll_interval).await {
                break;
            }
        }

        self.control.mark_stopped();
        info!("Assignment poller stopped");
    }
}

/// Continue without pausing unless nothing was popped or the reference was requeued
fn keeps_draining(result: &AssignmentResult) -> bool {
    !matches!(
        result.failure,
        Some(FailureCategory::QueueEmpty) | Some(FailureCategory::TransientStore)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::engine::EngineConfig;
    use crate::database::{ComplaintStore, InMemoryComplaintStore};
    use crate::messaging::{InMemoryListQueue, ListQueue};
    use crate::models::{
        description_fingerprint, ComplaintLocation, Department, NewComplaint, OperatorCandidate,
        OperatorPool, OperatorStatus, ProcessedReference, Urgency,
    };
    use uuid::Uuid;

    #[test]
    fn test_drain_stops_on_empty_or_requeue() {
        let empty = AssignmentResult::failed(FailureCategory::QueueEmpty, None, "empty");
        let requeued = AssignmentResult::failed(FailureCategory::TransientStore, None, "requeued");
        let unrouted =
            AssignmentResult::failed(FailureCategory::NoEligibleCandidate, None, "no agents");
        assert!(!keeps_draining(&empty));
        assert!(!keeps_draining(&requeued));
        assert!(keeps_draining(&unrouted));
    }

    #[tokio::test]
    async fn test_poller_drains_queue_and_stops() {
        let queue = Arc::new(InMemoryListQueue::new());
        let store = Arc::new(InMemoryComplaintStore::new());
        let config = EngineConfig::default();
        let engine = Arc::new(AssignmentEngine::new(queue.clone(), store, config.clone()));

        // Unknown complaints are terminal per item, so the drain does not pause
        for _ in 0..3 {
            let reference = ProcessedReference {
                id: Uuid::new_v4().to_string(),
                assigned_department: Some("INFRASTRUCTURE".to_string()),
                district: Some("Ranchi".to_string()),
            };
            queue
                .push(&config.processed_queue, &reference.to_payload().unwrap())
                .await
                .unwrap();
        }

        let poller = Arc::new(AssignmentPoller::new(engine, Duration::from_secs(60)));
        let handle = poller.start().expect("first start spawns");
        assert!(poller.start().is_none());

        tokio::time::timeout(Duration::from_secs(5), async {
            while queue.len(&config.processed_queue).await.unwrap() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queue drained");

        poller.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits promptly")
            .unwrap();
        assert_eq!(poller.state(), LoopState::Stopped);
    }

    #[tokio::test]
    async fn test_poller_assigns_complaints() {
        let queue = Arc::new(InMemoryListQueue::new());
        let store = Arc::new(InMemoryComplaintStore::new());
        let config = EngineConfig::default();
        let engine = Arc::new(AssignmentEngine::new(queue.clone(), store.clone(), config.clone()));

        let agent = OperatorCandidate {
            id: Uuid::new_v4(),
            name: "Ravi Oraon".to_string(),
            jurisdiction: "Ranchi".to_string(),
            current_workload: 0,
            workload_limit: 5,
            status: OperatorStatus::Active,
        };
        store.add_candidate(OperatorPool::Agent, agent.clone());
        let complaint = store
            .create_complaint(NewComplaint {
                submitter_id: "u1".to_string(),
                category_id: "c1".to_string(),
                sub_category: "Potholes".to_string(),
                description: String::new(),
                description_fingerprint: description_fingerprint(""),
                urgency: Urgency::Low,
                department: Department::Infrastructure,
                is_public: true,
                is_duplicate: false,
                attachment_url: None,
                location: ComplaintLocation {
                    pin: "834001".to_string(),
                    district: "Ranchi".to_string(),
                    city: "Ranchi".to_string(),
                    locality: "Kanke".to_string(),
                    street: None,
                    latitude: None,
                    longitude: None,
                },
            })
            .await
            .unwrap();
        let reference = ProcessedReference::new(complaint.id, "INFRASTRUCTURE", "Ranchi");
        queue
            .push(&config.processed_queue, &reference.to_payload().unwrap())
            .await
            .unwrap();

        let poller = Arc::new(AssignmentPoller::new(engine, Duration::from_millis(10)));
        let handle = poller.start().expect("first start spawns");

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.complaint(complaint.id).unwrap().assigned_agent_id.is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("complaint assigned");

        poller.stop();
        handle.await.unwrap();
        assert_eq!(
            store.candidate(OperatorPool::Agent, agent.id).unwrap().current_workload,
            1
        );
    }
}
