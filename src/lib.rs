//! Connection Health Policy
//!
//! Decides whether a recurring replication connection that keeps failing
//! should be disabled, warned about, or left alone.
//!
//! # Signals
//!
//! - **Failure streak**: consecutive failed jobs, most recent first, with
//!   cancelled jobs ignored
//! - **Failure-only window**: every job in the last `N` days failed and the
//!   connection's first job is at least `N` days old
//!
//! Either signal at its full threshold disables the connection; either signal
//! at half its threshold sends a warning.
//!
//! The policy is a single-shot activity: it is invoked by an external
//! orchestrator, reads from and writes to collaborators behind the traits in
//! [`ports`], and keeps no state of its own.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod fixture;
pub mod job;
pub mod memory;
pub mod policy;
pub mod ports;

pub use error::{Error, Result};
pub use policy::{AutoDisableInput, AutoDisableOutput, AutoDisablePolicy, Decision};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays parseable JSON
    let installed = match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {e}")))
}
