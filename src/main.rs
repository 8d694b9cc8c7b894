//! Connection Health Policy - command-line driver
//!
//! Runs the auto-disable policy against a history fixture.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::json;
use tracing::error;

use conn_health_policy::{
    AutoDisableInput, AutoDisablePolicy,
    cli::{Cli, Command},
    config::Config,
    connection::ConnectionId,
    fixture::Fixture,
    memory::{RecordingNotifier, StaticFeatureFlag},
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Evaluate {
            fixture,
            connection,
            now,
            dry_run,
        } => run_evaluate(&config, &fixture, connection, now.unwrap_or_else(Utc::now), dry_run).await,
        Command::CheckConfig => run_check_config(&config),
    }
}

/// Evaluate one connection and print the outcome as JSON
async fn run_evaluate(
    config: &Config,
    fixture_path: &Path,
    connection_id: ConnectionId,
    now: DateTime<Utc>,
    dry_run: bool,
) -> ExitCode {
    let fixture = match Fixture::load(fixture_path) {
        Ok(fixture) => fixture,
        Err(e) => {
            eprintln!("❌ Failed to load fixture {}: {e}", fixture_path.display());
            return ExitCode::FAILURE;
        }
    };

    let (history, connections) = fixture.into_stores();
    let connections = Arc::new(connections);
    let notifier = Arc::new(RecordingNotifier::new());
    let policy = AutoDisablePolicy::new(
        Arc::new(StaticFeatureFlag::from(&config.feature_flags)),
        config.thresholds,
        Arc::new(history),
        connections.clone(),
        notifier.clone(),
    );

    let input = AutoDisableInput { connection_id, now };
    let report = if dry_run {
        policy.decide(input).await.map(|decision| {
            json!({
                "connection_id": connection_id,
                "evaluated_at": now,
                "dry_run": true,
                "decision": decision,
            })
        })
    } else {
        policy
            .auto_disable_failing_connection(input)
            .await
            .map(|output| {
                json!({
                    "connection_id": connection_id,
                    "evaluated_at": now,
                    "output": output,
                    "status": connections.status(connection_id),
                    "notifications": notifier.sent(),
                })
            })
    };

    match report {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Failed to serialize to JSON: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!(%connection_id, error = %e, transient = e.is_transient(), "Evaluation failed");
            eprintln!("❌ Evaluation failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Print the effective policy configuration
fn run_check_config(config: &Config) -> ExitCode {
    let thresholds = &config.thresholds;
    println!("✅ Configuration valid");
    println!(
        "   Auto-disable: {}",
        if config.feature_flags.auto_disables_failing_connections {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "   Failed jobs in a row: disable at {}, warn at {}",
        thresholds.max_failed_jobs_in_a_row,
        thresholds.warning_failed_jobs_in_a_row()
    );
    println!(
        "   Days of only failed jobs: disable at {}, warn at {}",
        thresholds.max_days_of_only_failed_jobs,
        thresholds.warning_days_of_only_failed_jobs()
    );
    println!("   Warning trigger: {:?}", thresholds.warning_trigger);
    ExitCode::SUCCESS
}
