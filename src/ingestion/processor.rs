//! # Complaint Processor
//!
//! Peek-then-commit consumer of the Ingestion Queue. Each call to
//! [`ComplaintProcessor::process_next`] handles at most one submission:
//!
//! 1. ensure the queue connection
//! 2. peek the head (empty: nothing to do)
//! 3. parse the payload as JSON
//! 4. validate the schema (failure: remove, optionally dead-letter)
//! 5. look up a matching complaint inside the duplicate window
//! 6. persist complaint and location in one transaction
//! 7. remove the entry only after persistence succeeded
//! 8. push a routing reference to the Processed Queue unless duplicate
//!
//! Transient store failures leave the entry at the head for the next poll.
//! The entry is removed by value (`LREM 1`) so a concurrent consumer's head
//! is never taken by mistake.

use crate::config::PipelineConfig;
use crate::database::{ComplaintStore, StoreError};
use crate::logging::{log_error, log_ingestion_operation};
use crate::messaging::{ListQueue, QueueError, QueueResult};
use crate::models::{ComplaintStatus, PersistedComplaint, ProcessedReference, RawSubmission};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub const MSG_PARSE_FAILED: &str = "Failed to parse complaint payload";
pub const MSG_INVALID_REMOVED: &str = "Invalid complaint data removed from queue";
pub const MSG_CONSTRAINT_REMOVED: &str =
    "Invalid complaint removed from queue (constraint violation)";
pub const MSG_SCHEMA_DEAD_LETTERED: &str =
    "Complaint dead-lettered after a store schema error";

/// Configuration for complaint processing
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub registration_queue: String,
    pub processed_queue: String,
    pub dead_letter_queue: String,
    pub duplicate_window: chrono::Duration,
    pub dead_letter_unparseable: bool,
    pub dead_letter_invalid: bool,
}

impl ProcessorConfig {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            registration_queue: config.queue.registration_queue.clone(),
            processed_queue: config.queue.processed_queue.clone(),
            dead_letter_queue: config.queue.dead_letter_queue.clone(),
            duplicate_window: config.ingestion.duplicate_window(),
            dead_letter_unparseable: config.ingestion.dead_letter_unparseable,
            dead_letter_invalid: config.ingestion.dead_letter_invalid,
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::from_pipeline(&PipelineConfig::default())
    }
}

/// What happened to the entry at the head of the Ingestion Queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Queue was empty
    Empty,
    Persisted,
    /// Persisted with `is_duplicate = true`, not routed
    Duplicate,
    /// Failed schema validation and removed
    InvalidRemoved,
    /// Unparseable or hit a store schema error, moved to the dead-letter list
    DeadLettered,
    /// Left in place for a later poll
    RetryLater,
}

impl Disposition {
    /// The entry left the Ingestion Queue with a final outcome
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Persisted | Self::Duplicate | Self::InvalidRemoved | Self::DeadLettered
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSummary {
    pub id: Uuid,
    pub seq: i64,
    pub status: ComplaintStatus,
    pub is_duplicate: bool,
}

impl From<&PersistedComplaint> for ProcessedSummary {
    fn from(complaint: &PersistedComplaint) -> Self {
        Self {
            id: complaint.id,
            seq: complaint.seq,
            status: complaint.status,
            is_duplicate: complaint.is_duplicate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessedSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub disposition: Disposition,
}

impl ProcessOutcome {
    fn empty() -> Self {
        Self {
            processed: false,
            result: None,
            error: None,
            disposition: Disposition::Empty,
        }
    }

    fn rejected(disposition: Disposition, error: impl Into<String>) -> Self {
        Self {
            processed: false,
            result: None,
            error: Some(error.into()),
            disposition,
        }
    }

    fn persisted(complaint: &PersistedComplaint) -> Self {
        Self {
            processed: true,
            result: Some(ProcessedSummary::from(complaint)),
            error: None,
            disposition: if complaint.is_duplicate {
                Disposition::Duplicate
            } else {
                Disposition::Persisted
            },
        }
    }
}

/// Validates, deduplicates, and persists Ingestion Queue entries
pub struct ComplaintProcessor {
    queue: Arc<dyn ListQueue>,
    store: Arc<dyn ComplaintStore>,
    config: ProcessorConfig,
}

impl std::fmt::Debug for ComplaintProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplaintProcessor")
            .field("config", &self.config)
            .finish()
    }
}

impl ComplaintProcessor {
    pub fn new(
        queue: Arc<dyn ListQueue>,
        store: Arc<dyn ComplaintStore>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            queue,
            store,
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Process the entry at the head of the Ingestion Queue, if any
    #[instrument(skip(self), fields(queue = %self.config.registration_queue))]
    pub async fn process_next(&self) -> ProcessOutcome {
        let list = self.config.registration_queue.as_str();

        if let Err(e) = self.queue.ensure_connected().await {
            return queue_unavailable(&e);
        }

        let payload = match self.queue.peek(list).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!("Ingestion queue empty");
                return ProcessOutcome::empty();
            }
            Err(e) => return queue_unavailable(&e),
        };

        let value = match serde_json::from_str::<serde_json::Value>(&payload) {
            Ok(value) => value,
            Err(e) => return self.handle_unparseable(&payload, &e).await,
        };

        let submission = match RawSubmission::from_value(value).and_then(RawSubmission::validate) {
            Ok(submission) => submission,
            Err(e) => {
                warn!(issues = ?e.issues, "Complaint failed validation");
                if self.config.dead_letter_invalid {
                    if let Err(dl) = self.dead_letter(&payload).await {
                        warn!(error = %dl, "Failed to dead-letter invalid complaint");
                    }
                }
                return match self.queue.remove(list, &payload).await {
                    Ok(_) => {
                        log_ingestion_operation("validate", None, "invalid_removed", Some(&e.to_string()));
                        ProcessOutcome::rejected(Disposition::InvalidRemoved, MSG_INVALID_REMOVED)
                    }
                    Err(qe) => queue_unavailable(&qe),
                };
            }
        };

        let since = Utc::now() - self.config.duplicate_window;
        let duplicate_of = match self
            .store
            .find_recent_duplicate(&submission.duplicate_key(), since)
            .await
        {
            Ok(found) => found,
            Err(e) => return self.handle_store_error(list, &payload, e).await,
        };

        if let Some(original) = duplicate_of {
            info!(original_id = %original, submitter_id = %submission.submitter_id, "Duplicate complaint detected");
        }

        let new_complaint = submission.into_new_complaint(duplicate_of.is_some());
        let complaint = match self.store.create_complaint(new_complaint).await {
            Ok(complaint) => complaint,
            Err(e) => return self.handle_store_error(list, &payload, e).await,
        };

        if let Err(e) = self.queue.remove(list, &payload).await {
            // Re-delivery of this entry will be flagged as a duplicate
            log_error(
                "ingestion",
                "remove",
                &e.to_string(),
                Some(&format!("complaint_id={}", complaint.id)),
            );
        }

        if !complaint.is_duplicate {
            self.route(&complaint).await;
        }

        log_ingestion_operation(
            "persist",
            Some(&complaint.id.to_string()),
            if complaint.is_duplicate { "duplicate" } else { "registered" },
            None,
        );

        ProcessOutcome::persisted(&complaint)
    }

    async fn route(&self, complaint: &PersistedComplaint) {
        let district = complaint.location_district().unwrap_or_default();
        let reference =
            ProcessedReference::new(complaint.id, complaint.department.as_str(), district);

        let pushed = match reference.to_payload() {
            Ok(entry) => self
                .queue
                .push(&self.config.processed_queue, &entry)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        if let Err(e) = pushed {
            // Persistence stands; the complaint needs a manual re-route
            log_error(
                "ingestion",
                "route",
                &e,
                Some(&format!("complaint_id={}", complaint.id)),
            );
        }
    }

    async fn handle_unparseable(&self, payload: &str, err: &serde_json::Error) -> ProcessOutcome {
        warn!(error = %err, "Unparseable complaint payload");

        if !self.config.dead_letter_unparseable {
            return ProcessOutcome::rejected(Disposition::RetryLater, MSG_PARSE_FAILED);
        }

        if let Err(e) = self.dead_letter(payload).await {
            return queue_unavailable(&e);
        }
        if let Err(e) = self.queue.remove(&self.config.registration_queue, payload).await {
            warn!(error = %e, "Payload dead-lettered but still queued; the next attempt only removes it");
            return queue_unavailable(&e);
        }

        log_ingestion_operation("parse", None, "dead_lettered", Some(&err.to_string()));
        ProcessOutcome::rejected(Disposition::DeadLettered, MSG_PARSE_FAILED)
    }

    /// Copy `payload` to the dead-letter list unless an earlier attempt already did
    async fn dead_letter(&self, payload: &str) -> QueueResult<()> {
        let list = self.config.dead_letter_queue.as_str();
        if self.queue.contains(list, payload).await? {
            debug!("Payload already dead-lettered");
            return Ok(());
        }
        self.queue.push(list, payload).await?;
        Ok(())
    }

    async fn handle_store_error(&self, list: &str, payload: &str, err: StoreError) -> ProcessOutcome {
        if !err.is_permanent() {
            warn!(error = %err, "Store unavailable, complaint left in queue");
            return ProcessOutcome::rejected(
                Disposition::RetryLater,
                format!("Store error, complaint left in queue: {err}"),
            );
        }

        if matches!(err, StoreError::Schema { .. }) {
            // The submission itself may be fine; keep a copy for replay
            error!(error = %err, "Store schema error, complaint dead-lettered");
            if let Err(e) = self.dead_letter(payload).await {
                return queue_unavailable(&e);
            }
            return match self.queue.remove(list, payload).await {
                Ok(_) => {
                    log_ingestion_operation("persist", None, "dead_lettered", Some(&err.to_string()));
                    ProcessOutcome::rejected(Disposition::DeadLettered, MSG_SCHEMA_DEAD_LETTERED)
                }
                Err(e) => queue_unavailable(&e),
            };
        }

        match self.queue.remove(list, payload).await {
            Ok(_) => {
                log_ingestion_operation("persist", None, "constraint_removed", Some(&err.to_string()));
                ProcessOutcome::rejected(Disposition::InvalidRemoved, MSG_CONSTRAINT_REMOVED)
            }
            Err(e) => queue_unavailable(&e),
        }
    }
}

fn queue_unavailable(err: &QueueError) -> ProcessOutcome {
    if err.is_connectivity() {
        debug!(error = %err, "Ingestion queue unavailable");
    } else {
        warn!(error = %err, "Ingestion queue command failed");
    }
    ProcessOutcome::rejected(Disposition::RetryLater, format!("Queue unavailable: {err}"))
}
