//! # Batch Driver
//!
//! Drains up to `limit` Processed Queue references through the engine and
//! aggregates the outcomes. One item's failure never aborts the batch; an
//! empty queue ends it early.

use super::engine::AssignmentEngine;
use crate::models::AssignmentResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<AssignmentResult>,
}

impl BatchSummary {
    fn record(&mut self, result: AssignmentResult) {
        self.processed += 1;
        if result.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }
}

#[derive(Debug, Clone)]
pub struct BatchDriver {
    engine: Arc<AssignmentEngine>,
}

impl BatchDriver {
    pub fn new(engine: Arc<AssignmentEngine>) -> Self {
        Self { engine }
    }

    /// At most `limit` pop attempts
    #[instrument(skip(self))]
    pub async fn process_batch(&self, limit: usize) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for _ in 0..limit {
            let result = self.engine.auto_assign_one().await;
            if result.is_queue_empty() {
                break;
            }
            summary.record(result);
        }

        info!(
            processed = summary.processed,
            successful = summary.successful,
            failed = summary.failed,
            "Assignment batch completed"
        );
        summary
    }
}
