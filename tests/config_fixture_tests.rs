//! Configuration loading and fixture-driven evaluation

use std::sync::Arc;

use pretty_assertions::assert_eq;

use conn_health_policy::config::Config;
use conn_health_policy::connection::{ConnectionId, ConnectionStatus};
use conn_health_policy::fixture::Fixture;
use conn_health_policy::memory::{RecordingNotifier, StaticFeatureFlag};
use conn_health_policy::policy::WarningTrigger;
use conn_health_policy::{AutoDisableInput, AutoDisablePolicy, Decision};

const CONNECTION: &str = "8c5b1a9e-3a8e-4c5f-9e55-0b1f7d6c2a11";

const FIXTURE: &str = r#"
connections:
  - id: 8c5b1a9e-3a8e-4c5f-9e55-0b1f7d6c2a11
    status: active
    jobs:
      - { id: 5, status: failed, created_at: "2024-03-15T10:00:00Z" }
      - { id: 4, status: cancelled, created_at: "2024-03-15T09:00:00Z" }
      - { id: 3, status: failed, created_at: "2024-03-15T08:00:00Z" }
      - { id: 2, status: failed, created_at: "2024-03-15T07:00:00Z" }
      - { id: 1, status: succeeded, created_at: "2024-03-15T06:00:00Z" }
      - { id: 6, kind: discover_schema, status: failed, created_at: "2024-03-15T11:00:00Z" }
"#;

#[test]
fn test_load_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.yaml");
    std::fs::write(
        &path,
        r"
feature_flags:
  auto_disables_failing_connections: true
thresholds:
  max_failed_jobs_in_a_row: 3
  max_days_of_only_failed_jobs: 7
  warning_trigger: exact_midpoint
",
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.thresholds.max_failed_jobs_in_a_row, 3);
    assert_eq!(config.thresholds.max_days_of_only_failed_jobs, 7);
    assert_eq!(config.thresholds.warning_trigger, WarningTrigger::ExactMidpoint);
}

#[test]
fn test_load_config_rejects_zero_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.yaml");
    std::fs::write(&path, "thresholds:\n  max_failed_jobs_in_a_row: 0\n").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();

    assert!(err.to_string().contains("max_failed_jobs_in_a_row"));
}

#[tokio::test]
async fn test_evaluate_fixture_with_small_thresholds() {
    let dir = tempfile::tempdir().unwrap();
    let fixture_path = dir.path().join("history.yaml");
    std::fs::write(&fixture_path, FIXTURE).unwrap();

    let config_path = dir.path().join("policy.yaml");
    std::fs::write(&config_path, "thresholds:\n  max_failed_jobs_in_a_row: 3\n").unwrap();
    let config = Config::load(Some(&config_path)).unwrap();

    let (history, connections) = Fixture::load(&fixture_path).unwrap().into_stores();
    let connections = Arc::new(connections);
    let notifier = Arc::new(RecordingNotifier::new());
    let policy = AutoDisablePolicy::new(
        Arc::new(StaticFeatureFlag::from(&config.feature_flags)),
        config.thresholds,
        Arc::new(history),
        connections.clone(),
        notifier.clone(),
    );

    let connection_id: ConnectionId = CONNECTION.parse().unwrap();
    let now = "2024-03-15T12:00:00Z".parse().unwrap();
    let output = policy
        .auto_disable_failing_connection(AutoDisableInput { connection_id, now })
        .await
        .unwrap();

    // Three failures with a cancelled run in between reach the threshold;
    // the schema discovery failure is not a replication job.
    assert!(output.disabled);
    assert!(matches!(output.decision, Decision::Disable(_)));
    assert_eq!(connections.status(connection_id), Some(ConnectionStatus::Inactive));
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].job_id, 5);
}
