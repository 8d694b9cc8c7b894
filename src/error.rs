//! Error types for the connection health policy

use std::io;

use thiserror::Error;

use crate::connection::ConnectionId;

/// Result type alias for the connection health policy
pub type Result<T> = std::result::Result<T, Error>;

/// Connection health policy errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection could not be located when its status was written
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// Job-history store failure
    #[error("Job history error: {0}")]
    History(String),

    /// Connection configuration store failure
    #[error("Connection store error: {0}")]
    ConnectionStore(String),

    /// Notification channel failure
    #[error("Notification error: {0}")]
    Notification(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error came from a collaborator's infrastructure and may
    /// succeed when the orchestrator retries the whole invocation.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::History(_) | Self::ConnectionStore(_) | Self::Notification(_) | Self::Io(_)
        )
    }
}
