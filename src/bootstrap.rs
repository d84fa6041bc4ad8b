//! # Pipeline Bootstrap
//!
//! Startup helpers shared by the binaries: building the pipeline components
//! from configuration and blocking until the queue client reports ready.

use crate::assignment::{
    AssignmentEngine, AssignmentInvoker, AssignmentWorker, BatchDriver, EngineConfig,
    HttpAssignmentInvoker, InProcessInvoker, WorkerSettings,
};
use crate::config::{InvokerMode, PipelineConfig};
use crate::database::ComplaintStore;
use crate::error::{PipelineError, Result};
use crate::ingestion::{ComplaintProcessor, ProcessorConfig};
use crate::messaging::ListQueue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Block until `queue` is ready, checking `attempts` times `interval` apart
pub async fn wait_for_queue_ready(
    queue: &dyn ListQueue,
    attempts: u32,
    interval: Duration,
) -> Result<()> {
    for attempt in 1..=attempts {
        match queue.ensure_connected().await {
            Ok(()) if queue.is_ready() => {
                info!(attempt = attempt, "✅ Queue client ready");
                return Ok(());
            }
            Ok(()) => debug!(attempt = attempt, "Queue client connected but not ready"),
            Err(e) => warn!(attempt = attempt, error = %e, "Queue client not ready"),
        }

        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Err(PipelineError::QueueNotReady { attempts })
}

/// Wired pipeline stages sharing one queue and one store
#[derive(Debug, Clone)]
pub struct PipelineComponents {
    pub processor: Arc<ComplaintProcessor>,
    pub engine: Arc<AssignmentEngine>,
    pub batch: BatchDriver,
}

impl PipelineComponents {
    pub fn new(
        config: &PipelineConfig,
        queue: Arc<dyn ListQueue>,
        store: Arc<dyn ComplaintStore>,
    ) -> Self {
        let processor = Arc::new(ComplaintProcessor::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            ProcessorConfig::from_pipeline(config),
        ));
        let engine = Arc::new(AssignmentEngine::new(
            queue,
            store,
            EngineConfig::from_pipeline(config),
        ));
        let batch = BatchDriver::new(Arc::clone(&engine));

        Self {
            processor,
            engine,
            batch,
        }
    }
}

/// Pick the invoker configured in `worker.invoker`
///
/// The in-process invoker needs an engine; the HTTP invoker only needs the
/// assignment API url.
pub fn build_invoker(
    config: &PipelineConfig,
    engine: Option<Arc<AssignmentEngine>>,
) -> Result<Arc<dyn AssignmentInvoker>> {
    match (config.worker.invoker, engine) {
        (InvokerMode::Http, _) => {
            let invoker = HttpAssignmentInvoker::new(
                &config.worker.assignment_api_url,
                config.worker.request_timeout(),
            )?;
            info!(endpoint = %invoker.endpoint(), "Using HTTP assignment invoker");
            Ok(Arc::new(invoker))
        }
        (InvokerMode::InProcess, Some(engine)) => {
            info!("Using in-process assignment invoker");
            Ok(Arc::new(InProcessInvoker::new(engine)))
        }
        (InvokerMode::InProcess, None) => Err(PipelineError::Configuration(
            crate::config::ConfigurationError::validation_error(
                "in_process invoker requires a complaint store",
            ),
        )),
    }
}

pub fn build_worker(
    config: &PipelineConfig,
    queue: Arc<dyn ListQueue>,
    invoker: Arc<dyn AssignmentInvoker>,
) -> Arc<AssignmentWorker> {
    Arc::new(AssignmentWorker::new(
        queue,
        invoker,
        WorkerSettings::from_pipeline(config),
    ))
}

/// Wait for Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
