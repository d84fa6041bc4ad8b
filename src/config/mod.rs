//! # Pipeline Configuration System
//!
//! Layered configuration for the complaint pipeline: a base YAML file, an
//! optional per-environment overlay, and environment variable overrides.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use complaint_pipeline::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//!
//! let processed_queue = &manager.config().queue.processed_queue;
//! let cooldown = manager.config().worker.failure_cooldown();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/pipeline.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Queue backend connection and list names
    pub queue: QueueConfig,

    /// Relational store connection settings
    pub database: DatabaseConfig,

    /// Validator/persister behavior
    pub ingestion: IngestionConfig,

    /// Assignment engine and batch settings
    pub assignment: AssignmentConfig,

    /// Assignment worker loop settings
    pub worker: WorkerConfig,

    /// Internal HTTP surface
    pub web: WebConfig,
}

impl PipelineConfig {
    /// Validate cross-field constraints after deserialization
    pub fn validate(&self) -> ConfigResult<()> {
        self.queue.validate()?;

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "must be at least 1",
            ));
        }

        if self.ingestion.duplicate_window_hours <= 0 {
            return Err(ConfigurationError::invalid_value(
                "ingestion.duplicate_window_hours",
                self.ingestion.duplicate_window_hours.to_string(),
                "must be positive",
            ));
        }

        if self.assignment.default_batch_limit == 0 {
            return Err(ConfigurationError::invalid_value(
                "assignment.default_batch_limit",
                "0",
                "must be at least 1",
            ));
        }

        if self.worker.allowed_jurisdictions.is_empty() {
            return Err(ConfigurationError::validation_error(
                "worker.allowed_jurisdictions must list at least one jurisdiction",
            ));
        }

        if self.worker.invoker == InvokerMode::Http && self.worker.assignment_api_url.is_empty() {
            return Err(ConfigurationError::validation_error(
                "worker.assignment_api_url is required when worker.invoker is 'http'",
            ));
        }

        Ok(())
    }
}

/// Queue topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    #[default]
    Single,
    Cluster,
    Sentinel,
}

/// Queue backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub mode: QueueMode,
    /// Connection URL for single-node mode
    pub url: String,
    /// Seed nodes for cluster mode, or sentinel addresses for sentinel mode
    pub nodes: Vec<String>,
    /// Master group name monitored by the sentinels
    pub sentinel_master: Option<String>,
    pub registration_queue: String,
    pub processed_queue: String,
    pub assignment_queue: String,
    pub dead_letter_queue: String,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_connect_attempts: u32,
    pub blocking_pop_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mode: QueueMode::Single,
            url: "redis://localhost:6379".to_string(),
            nodes: Vec::new(),
            sentinel_master: None,
            registration_queue: "complaint:registration:queue".to_string(),
            processed_queue: "complaint:processed:queue".to_string(),
            assignment_queue: "complaint:assignment:queue".to_string(),
            dead_letter_queue: "complaint:assignment:malformed".to_string(),
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            max_connect_attempts: 10,
            blocking_pop_timeout_ms: 5_000,
        }
    }
}

impl QueueConfig {
    fn validate(&self) -> ConfigResult<()> {
        let names = [
            ("queue.registration_queue", &self.registration_queue),
            ("queue.processed_queue", &self.processed_queue),
            ("queue.assignment_queue", &self.assignment_queue),
            ("queue.dead_letter_queue", &self.dead_letter_queue),
        ];
        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    field,
                    name.as_str(),
                    "queue names cannot be empty",
                ));
            }
        }

        match self.mode {
            QueueMode::Single if self.url.is_empty() => Err(ConfigurationError::invalid_value(
                "queue.url",
                "",
                "single mode requires a url",
            )),
            QueueMode::Cluster if self.nodes.is_empty() => Err(
                ConfigurationError::validation_error("cluster mode requires queue.nodes"),
            ),
            QueueMode::Sentinel if self.nodes.is_empty() || self.sentinel_master.is_none() => {
                Err(ConfigurationError::validation_error(
                    "sentinel mode requires queue.nodes and queue.sentinel_master",
                ))
            }
            _ => Ok(()),
        }
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn blocking_pop_timeout(&self) -> Duration {
        Duration::from_millis(self.blocking_pop_timeout_ms)
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/complaint_pipeline_development".to_string(),
            max_connections: 10,
            acquire_timeout_seconds: 30,
            run_migrations: true,
        }
    }
}

/// Validator/persister configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Recency window for duplicate detection
    pub duplicate_window_hours: i64,
    /// Move unparseable payloads to the dead-letter list instead of leaving them queued
    pub dead_letter_unparseable: bool,
    /// Also copy schema-invalid payloads to the dead-letter list when removing them
    pub dead_letter_invalid: bool,
    /// Interval between polls of the ingestion poller
    pub poll_interval_ms: u64,
    /// Start the ingestion poller with the server
    pub poll_on_start: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            duplicate_window_hours: 24,
            dead_letter_unparseable: false,
            dead_letter_invalid: false,
            poll_interval_ms: 10_000,
            poll_on_start: true,
        }
    }
}

impl IngestionConfig {
    pub fn duplicate_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.duplicate_window_hours)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Assignment engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssignmentConfig {
    pub default_batch_limit: usize,
    /// Fixed RNG seed for reproducible selection; unseeded when absent
    pub selection_seed: Option<u64>,
    /// Interval between Processed Queue polls of the assignment poller
    pub poll_interval_ms: u64,
    /// Start the assignment poller with the server; otherwise it waits for
    /// `POST /assignment/polling/start`
    pub poll_on_start: bool,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            default_batch_limit: 10,
            selection_seed: None,
            poll_interval_ms: 15_000,
            poll_on_start: false,
        }
    }
}

impl AssignmentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// How the worker reaches the assignment engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokerMode {
    #[default]
    InProcess,
    Http,
}

/// Assignment worker loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub allowed_jurisdictions: Vec<String>,
    pub invoker: InvokerMode,
    pub assignment_api_url: String,
    pub request_timeout_ms: u64,
    pub idle_interval_ms: u64,
    pub failure_cooldown_ms: u64,
    pub error_backoff_ms: u64,
    pub ready_wait_attempts: u32,
    pub ready_wait_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            allowed_jurisdictions: vec![
                "Ranchi".to_string(),
                "Dhanbad".to_string(),
                "Jamshedpur".to_string(),
            ],
            invoker: InvokerMode::InProcess,
            assignment_api_url: "http://localhost:3002".to_string(),
            request_timeout_ms: 10_000,
            idle_interval_ms: 10_000,
            failure_cooldown_ms: 30_000,
            error_backoff_ms: 5_000,
            ready_wait_attempts: 10,
            ready_wait_interval_ms: 1_000,
        }
    }
}

impl WorkerConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_millis(self.failure_cooldown_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn ready_wait_interval(&self) -> Duration {
        Duration::from_millis(self.ready_wait_interval_ms)
    }
}

/// Internal HTTP surface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:3002".to_string(),
        }
    }
}
