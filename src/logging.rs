//! # Structured Logging Module
//!
//! Environment-aware structured logging that writes human-readable output to
//! the console and JSON lines to a per-process file under `log/`.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level))
        };

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(environment != "production")
            .with_filter(filter());

        let log_dir = PathBuf::from("log");
        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");

        if let Err(e) = fs::create_dir_all(&log_dir) {
            // Console-only fallback when the log directory is unavailable
            let _ = tracing_subscriber::registry().with(console).try_init();
            tracing::warn!(error = %e, "⚠️ LOGGING: log directory unavailable, console output only");
            return;
        }

        let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = tracing_subscriber::registry().with(console).with(
            fmt::layer()
                .with_writer(file_writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter()),
        );

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_dir.join(&log_filename).display(),
            "🔧 STRUCTURED LOGGING: Initialized with file output"
        );

        // The writer must outlive the process
        std::mem::forget(guard);
    });
}

fn get_environment() -> String {
    std::env::var("PIPELINE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for queue operations
pub fn log_queue_operation(
    operation: &str,
    list: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        list = %list,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📬 QUEUE_OPERATION"
    );
}

/// Log structured data for complaint ingestion
pub fn log_ingestion_operation(
    operation: &str,
    complaint_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        complaint_id = complaint_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📥 INGESTION_OPERATION"
    );
}

/// Log structured data for assignment decisions
pub fn log_assignment_operation(
    operation: &str,
    complaint_id: Option<&str>,
    assignee_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        complaint_id = complaint_id,
        assignee_id = assignee_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🎯 ASSIGNMENT_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("staging"), "debug");
    }

    #[test]
    fn test_log_helpers_do_not_require_subscriber() {
        log_queue_operation("push", "complaint:processed:queue", "ok", None);
        log_assignment_operation("auto_assign", Some("c1"), Some("a1"), "assigned", None);
        log_error("worker", "invoke", "timeout", Some("jurisdiction=Ranchi"));
    }
}
