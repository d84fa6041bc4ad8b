use complaint_pipeline::config::{ConfigManager, InvokerMode, QueueMode};
use std::path::PathBuf;
use tokio_test::{assert_err, assert_ok};

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_repository_test_environment_loads() {
    let manager = assert_ok!(ConfigManager::load_from_directory_with_env(
        Some(config_dir()),
        "test"
    ));
    let config = manager.config();

    assert_eq!(manager.environment(), "test");
    assert_eq!(config.queue.mode, QueueMode::Single);
    assert_eq!(config.queue.registration_queue, "complaint:registration:queue");
    assert_eq!(config.queue.blocking_pop_timeout_ms, 100);
    assert_eq!(config.assignment.selection_seed, Some(42));
    assert_eq!(config.worker.idle_interval_ms, 50);
    assert_eq!(
        config.worker.allowed_jurisdictions,
        vec!["Ranchi", "Dhanbad", "Jamshedpur"]
    );
    assert_eq!(config.assignment.poll_interval_ms, 50);
    // Base values survive the overlay
    assert_eq!(config.ingestion.duplicate_window_hours, 24);
    assert!(!config.ingestion.dead_letter_unparseable);
    assert!(config.ingestion.poll_on_start);
    assert!(!config.assignment.poll_on_start);
}

#[test]
fn test_repository_production_environment_uses_http_invoker() {
    let manager = assert_ok!(ConfigManager::load_from_directory_with_env(
        Some(config_dir()),
        "production"
    ));
    let config = manager.config();

    assert_eq!(config.worker.invoker, InvokerMode::Http);
    assert!(!config.database.run_migrations);
    assert_eq!(config.worker.failure_cooldown_ms, 30_000);
}

#[test]
fn test_missing_directory_is_reported() {
    let missing = config_dir().join("does-not-exist");
    let err = assert_err!(ConfigManager::load_from_directory_with_env(Some(missing), "test"));
    assert!(err.to_string().contains("does-not-exist"));
}
