//! Collaborator interfaces the policy is wired against.
//!
//! The policy owns none of the state it reads or writes. Job history,
//! connection status, notification delivery and the feature gate all live
//! behind these traits so the decision logic can run against in-memory
//! implementations (see [`crate::memory`]) as easily as against real stores.
//!
//! Every trait is `Send + Sync` so implementations can be shared as
//! `Arc<dyn Trait>` across the orchestrator's tasks.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::connection::{ConnectionId, ConnectionStatus};
use crate::job::{JobKind, JobStatus, JobSummary};

/// Deployment-level feature gate
pub trait FeatureFlags: Send + Sync {
    /// Whether failing connections may be disabled automatically
    fn auto_disables_failing_connections(&self) -> bool;
}

/// Read-only view of the durable job-history store.
///
/// Absence of data is never an error: an empty list or `None` is a normal
/// answer. Errors are reserved for the store itself being unreachable.
#[async_trait]
pub trait JobHistory: Send + Sync {
    /// Statuses of jobs of the given kinds created at or after `since`,
    /// most recent first.
    async fn list_statuses(
        &self,
        connection_id: ConnectionId,
        kinds: &[JobKind],
        since: DateTime<Utc>,
    ) -> Result<Vec<JobStatus>>;

    /// Creation time of the connection's first-ever replication job
    async fn first_replication_job_created_at(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<DateTime<Utc>>>;

    /// Most recent replication job, referenced by notifications
    async fn last_replication_job(&self, connection_id: ConnectionId) -> Result<Option<JobSummary>>;
}

/// Connection configuration store
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Atomically overwrite the connection's status.
    ///
    /// Must return [`crate::Error::ConnectionNotFound`] when the connection
    /// does not exist. Writing the status a connection already has succeeds.
    async fn set_status(&self, connection_id: ConnectionId, status: ConnectionStatus) -> Result<()>;
}

/// Kind of alert sent about a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The connection was disabled
    Disabled,
    /// The connection is on its way to being disabled
    Warning,
}

impl NotificationKind {
    /// Template name understood by the delivery channel
    #[must_use]
    pub fn template(self) -> &'static str {
        match self {
            Self::Disabled => "Connection Disabled Notification",
            Self::Warning => "Connection Disabled Warning Notification",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template())
    }
}

/// Notification delivery channel.
///
/// Delivery is best-effort from the policy's point of view; the channel owns
/// its own retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a notification about `connection_id`, referencing its last job
    async fn send(
        &self,
        kind: NotificationKind,
        connection_id: ConnectionId,
        last_job: &JobSummary,
    ) -> Result<()>;
}
