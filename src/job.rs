//! Replication job model: statuses, kinds, and the history window

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, not yet picked up
    Pending,
    /// Currently running
    Running,
    /// Attempt failed, job will be retried
    Incomplete,
    /// All attempts failed
    Failed,
    /// Completed successfully
    Succeeded,
    /// Cancelled by a user or the scheduler
    Cancelled,
}

impl JobStatus {
    /// Whether the job has reached a final state
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Succeeded | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Incomplete => "incomplete",
            Self::Failed => "failed",
            Self::Succeeded => "succeeded",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Kind of work a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Regular data sync
    Sync,
    /// Reset of the destination data followed by a sync
    ResetConnection,
    /// Source connectivity check
    CheckConnectionSource,
    /// Destination connectivity check
    CheckConnectionDestination,
    /// Source schema discovery
    DiscoverSchema,
    /// Connector spec fetch
    GetSpec,
}

/// Job kinds that move data; the only ones the policy looks at
pub const REPLICATION_KINDS: &[JobKind] = &[JobKind::Sync, JobKind::ResetConnection];

impl JobKind {
    /// Whether this kind counts as a replication job
    #[must_use]
    pub fn is_replication(self) -> bool {
        REPLICATION_KINDS.contains(&self)
    }
}

/// Minimal view of a job, enough to reference it from a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Job id in the history store
    pub id: i64,
    /// Kind of job
    pub kind: JobKind,
    /// Final or current status
    pub status: JobStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Job statuses in a lookback window, most recent first
///
/// The order is whatever the history store returned and is never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHistoryWindow(Vec<JobStatus>);

impl JobHistoryWindow {
    /// Wrap statuses already ordered most-recent-first
    #[must_use]
    pub fn new(statuses: Vec<JobStatus>) -> Self {
        Self(statuses)
    }

    /// Iterate from the most recent job backward
    pub fn iter(&self) -> impl Iterator<Item = JobStatus> + '_ {
        self.0.iter().copied()
    }

    /// True when the window is non-empty and every job in it failed
    #[must_use]
    pub fn only_failures(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|s| *s == JobStatus::Failed)
    }
}
