//! # Web API Application State
//!
//! Shared state handed to every handler: the wired pipeline stages, the two
//! pollers they can switch on and off, plus the queue and store everything
//! runs against.

use crate::assignment::AssignmentPoller;
use crate::bootstrap::PipelineComponents;
use crate::config::PipelineConfig;
use crate::database::ComplaintStore;
use crate::ingestion::IngestionPoller;
use crate::messaging::ListQueue;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub components: PipelineComponents,
    pub ingestion_poller: Arc<IngestionPoller>,
    pub assignment_poller: Arc<AssignmentPoller>,
    pub queue: Arc<dyn ListQueue>,
    pub store: Arc<dyn ComplaintStore>,
    pub config: Arc<PipelineConfig>,
}

impl AppState {
    pub fn new(
        config: Arc<PipelineConfig>,
        queue: Arc<dyn ListQueue>,
        store: Arc<dyn ComplaintStore>,
    ) -> Self {
        let components = PipelineComponents::new(&config, Arc::clone(&queue), Arc::clone(&store));
        Self::with_components(config, queue, store, components)
    }

    /// State over already wired stages; the pollers are created stopped
    pub fn with_components(
        config: Arc<PipelineConfig>,
        queue: Arc<dyn ListQueue>,
        store: Arc<dyn ComplaintStore>,
        components: PipelineComponents,
    ) -> Self {
        let ingestion_poller = Arc::new(IngestionPoller::new(
            Arc::clone(&components.processor),
            config.ingestion.poll_interval(),
        ));
        let assignment_poller = Arc::new(AssignmentPoller::new(
            Arc::clone(&components.engine),
            config.assignment.poll_interval(),
        ));
        Self {
            components,
            ingestion_poller,
            assignment_poller,
            queue,
            store,
            config,
        }
    }
}
