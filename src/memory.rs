//! In-memory collaborators.
//!
//! Back the policy with process-local state: the CLI loads them from a
//! fixture file, and tests use them to script histories and inspect what the
//! policy wrote. Every store counts the calls it receives so callers can
//! assert on how much work an evaluation did.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::FeatureFlagsConfig;
use crate::connection::{ConnectionId, ConnectionStatus};
use crate::job::{JobKind, JobStatus, JobSummary};
use crate::ports::{ConnectionStore, FeatureFlags, JobHistory, NotificationKind, Notifier};
use crate::{Error, Result};

// ============================================================================
// Feature flag
// ============================================================================

/// Feature gate fixed at construction time
#[derive(Debug, Clone, Copy)]
pub struct StaticFeatureFlag {
    enabled: bool,
}

impl StaticFeatureFlag {
    /// Gate that always answers `enabled`
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl From<&FeatureFlagsConfig> for StaticFeatureFlag {
    fn from(config: &FeatureFlagsConfig) -> Self {
        Self::new(config.auto_disables_failing_connections)
    }
}

impl FeatureFlags for StaticFeatureFlag {
    fn auto_disables_failing_connections(&self) -> bool {
        self.enabled
    }
}

// ============================================================================
// Job history
// ============================================================================

/// One job as stored in the in-memory history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job id
    pub id: i64,
    /// Kind of job
    #[serde(default = "default_job_kind")]
    pub kind: JobKind,
    /// Job status
    pub status: JobStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

fn default_job_kind() -> JobKind {
    JobKind::Sync
}

impl JobRecord {
    fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            kind: self.kind,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Job-history store keyed by connection
#[derive(Debug, Default)]
pub struct InMemoryJobHistory {
    jobs: DashMap<ConnectionId, Vec<JobRecord>>,
    queries: AtomicU64,
}

impl InMemoryJobHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job to a connection's history
    pub fn record(&self, connection_id: ConnectionId, job: JobRecord) {
        self.jobs.entry(connection_id).or_default().push(job);
    }

    /// Number of queries served so far
    #[must_use]
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// Jobs of a connection matching `filter`, newest first
    fn jobs_where(
        &self,
        connection_id: ConnectionId,
        filter: impl Fn(&JobRecord) -> bool,
    ) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self
            .jobs
            .get(&connection_id)
            .map(|jobs| jobs.iter().filter(|j| filter(j)).cloned().collect())
            .unwrap_or_default();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        jobs
    }
}

#[async_trait]
impl JobHistory for InMemoryJobHistory {
    async fn list_statuses(
        &self,
        connection_id: ConnectionId,
        kinds: &[JobKind],
        since: DateTime<Utc>,
    ) -> Result<Vec<JobStatus>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let jobs = self.jobs_where(connection_id, |j| {
            kinds.contains(&j.kind) && j.created_at >= since
        });
        Ok(jobs.into_iter().map(|j| j.status).collect())
    }

    async fn first_replication_job_created_at(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<DateTime<Utc>>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .jobs_where(connection_id, |j| j.kind.is_replication())
            .last()
            .map(|j| j.created_at))
    }

    async fn last_replication_job(&self, connection_id: ConnectionId) -> Result<Option<JobSummary>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .jobs_where(connection_id, |j| j.kind.is_replication())
            .first()
            .map(JobRecord::summary))
    }
}

// ============================================================================
// Connection store
// ============================================================================

/// Connection status store
#[derive(Debug, Default)]
pub struct InMemoryConnectionStore {
    connections: DashMap<ConnectionId, ConnectionStatus>,
    writes: AtomicU64,
}

impl InMemoryConnectionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection with an initial status
    pub fn insert(&self, connection_id: ConnectionId, status: ConnectionStatus) {
        self.connections.insert(connection_id, status);
    }

    /// Current status, if the connection exists
    #[must_use]
    pub fn status(&self, connection_id: ConnectionId) -> Option<ConnectionStatus> {
        self.connections.get(&connection_id).map(|s| *s)
    }

    /// Number of status writes received
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn set_status(&self, connection_id: ConnectionId, status: ConnectionStatus) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut current = self
            .connections
            .get_mut(&connection_id)
            .ok_or(Error::ConnectionNotFound(connection_id))?;
        if *current != status {
            tracing::debug!(%connection_id, from = %*current, to = %status, "Connection status changed");
            *current = status;
        }
        Ok(())
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// A notification accepted by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentNotification {
    /// Notification kind
    pub kind: NotificationKind,
    /// Connection it is about
    pub connection_id: ConnectionId,
    /// Job it references
    pub job_id: i64,
}

/// Notifier that logs and keeps every notification it is handed
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    /// Create a notifier with nothing sent
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of sent notifications, oldest first
    #[must_use]
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        kind: NotificationKind,
        connection_id: ConnectionId,
        last_job: &JobSummary,
    ) -> Result<()> {
        info!(%connection_id, job_id = last_job.id, template = kind.template(), "Notification sent");
        self.sent.lock().push(SentNotification {
            kind,
            connection_id,
            job_id: last_job.id,
        });
        Ok(())
    }
}
