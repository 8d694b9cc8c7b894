//! Command-line interface

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::connection::ConnectionId;

/// Connection health policy - disable or warn about failing connections
#[derive(Parser, Debug)]
#[command(name = "conn-health-policy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "CONN_HEALTH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "CONN_HEALTH_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "CONN_HEALTH_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate one connection against a history fixture and apply the decision
    Evaluate {
        /// Fixture file with connections and job history (YAML or JSON)
        #[arg(short, long, required = true)]
        fixture: PathBuf,

        /// Connection to evaluate
        #[arg(long, required = true)]
        connection: ConnectionId,

        /// Evaluation time (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Only print the decision, do not write status or notify
        #[arg(long)]
        dry_run: bool,
    },

    /// Load and validate configuration, then print the effective thresholds
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evaluate() {
        let cli = Cli::try_parse_from([
            "conn-health-policy",
            "--log-level",
            "debug",
            "evaluate",
            "--fixture",
            "history.yaml",
            "--connection",
            "8c5b1a9e-3a8e-4c5f-9e55-0b1f7d6c2a11",
            "--now",
            "2024-03-15T12:00:00Z",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Evaluate {
                fixture,
                connection,
                now,
                dry_run,
            } => {
                assert_eq!(fixture, PathBuf::from("history.yaml"));
                assert_eq!(connection.to_string(), "8c5b1a9e-3a8e-4c5f-9e55-0b1f7d6c2a11");
                assert_eq!(now.unwrap().to_rfc3339(), "2024-03-15T12:00:00+00:00");
                assert!(!dry_run);
            }
            Command::CheckConfig => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_rejects_bad_connection_id() {
        let result = Cli::try_parse_from([
            "conn-health-policy",
            "evaluate",
            "--fixture",
            "history.yaml",
            "--connection",
            "nope",
        ]);
        assert!(result.is_err());
    }
}
