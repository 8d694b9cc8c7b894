//! History window fetching and the sustained-failure signal.
//!
//! A connection trips the sustained-failure signal for a lookback of `d` days
//! when every replication job created in the last `d` days failed **and** its
//! first-ever replication job is at least `d` days old. The age check keeps a
//! brand-new connection whose first few runs failed from being judged on too
//! little history.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::{Error, Result};
use crate::connection::ConnectionId;
use crate::job::{JobHistoryWindow, REPLICATION_KINDS};
use crate::ports::JobHistory;

/// Start of a lookback window of `days` ending at `now`
///
/// Fails when the start falls outside the representable calendar range.
pub fn lookback_start(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| {
            Error::Config(format!(
                "lookback of {days} days from {now} is out of calendar range"
            ))
        })
}

/// Whether a connection whose first job is `first_job_age` old has existed
/// for at least `threshold_days` whole days
#[must_use]
pub fn old_enough(first_job_age: Option<Duration>, threshold_days: u32) -> bool {
    first_job_age.is_some_and(|age| age.num_days() >= i64::from(threshold_days))
}

/// Read-only queries against the job-history store for one connection
pub struct HistoryWindowFetcher<'a> {
    history: &'a dyn JobHistory,
    connection_id: ConnectionId,
    now: DateTime<Utc>,
}

impl<'a> HistoryWindowFetcher<'a> {
    /// Create a fetcher evaluating at `now`
    #[must_use]
    pub fn new(history: &'a dyn JobHistory, connection_id: ConnectionId, now: DateTime<Utc>) -> Self {
        Self {
            history,
            connection_id,
            now,
        }
    }

    /// Replication job statuses created in the last `lookback_days`, most recent first
    pub async fn fetch_window(&self, lookback_days: u32) -> Result<JobHistoryWindow> {
        let since = lookback_start(self.now, lookback_days)?;
        let statuses = self
            .history
            .list_statuses(self.connection_id, REPLICATION_KINDS, since)
            .await?;
        debug!(
            connection_id = %self.connection_id,
            lookback_days,
            jobs = statuses.len(),
            "Fetched history window"
        );
        Ok(JobHistoryWindow::new(statuses))
    }

    /// Time since the first-ever replication job, if there is one
    pub async fn fetch_first_job_age(&self) -> Result<Option<Duration>> {
        let created_at = self
            .history
            .first_replication_job_created_at(self.connection_id)
            .await?;
        Ok(created_at.map(|t| self.now - t))
    }
}

/// Evaluates the sustained-failure signal, fetching the first-job age at
/// most once per invocation
pub struct WindowAgeAnalyzer<'f, 'a> {
    fetcher: &'f HistoryWindowFetcher<'a>,
    first_job_age: Option<Option<Duration>>,
}

impl<'f, 'a> WindowAgeAnalyzer<'f, 'a> {
    /// Create an analyzer on top of a fetcher
    #[must_use]
    pub fn new(fetcher: &'f HistoryWindowFetcher<'a>) -> Self {
        Self {
            fetcher,
            first_job_age: None,
        }
    }

    /// Fetch the `threshold_days` window and check it
    pub async fn only_failures_and_old_enough(&mut self, threshold_days: u32) -> Result<bool> {
        let window = self.fetcher.fetch_window(threshold_days).await?;
        self.check(&window, threshold_days).await
    }

    /// Check an already fetched `threshold_days` window
    pub async fn check(&mut self, window: &JobHistoryWindow, threshold_days: u32) -> Result<bool> {
        if !window.only_failures() {
            return Ok(false);
        }
        let age = self.first_job_age().await?;
        let tripped = old_enough(age, threshold_days);
        debug!(
            threshold_days,
            first_job_age_days = age.map(|a| a.num_days()),
            tripped,
            "Checked failure-only window"
        );
        Ok(tripped)
    }

    async fn first_job_age(&mut self) -> Result<Option<Duration>> {
        if let Some(age) = self.first_job_age {
            return Ok(age);
        }
        let age = self.fetcher.fetch_first_job_age().await?;
        self.first_job_age = Some(age);
        Ok(age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_old_enough_boundary_is_inclusive() {
        assert!(old_enough(Some(Duration::days(14)), 14));
        assert!(old_enough(Some(Duration::days(20)), 14));
        assert!(!old_enough(Some(Duration::days(13)), 14));
    }

    #[test]
    fn test_old_enough_counts_whole_days() {
        let almost_two_days = Duration::days(2) - Duration::seconds(1);
        assert!(!old_enough(Some(almost_two_days), 2));
        assert!(old_enough(Some(almost_two_days), 1));
    }

    #[test]
    fn test_old_enough_requires_a_first_job() {
        assert!(!old_enough(None, 1));
    }

    #[test]
    fn test_first_job_in_the_future_is_not_old() {
        assert!(!old_enough(Some(Duration::days(-3)), 1));
    }

    #[test]
    fn test_lookback_start() {
        let now = DateTime::parse_from_rfc3339("2024-03-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let start = lookback_start(now, 14).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T12:00:00+00:00");
        assert_eq!(lookback_start(now, 0).unwrap(), now);
    }

    #[test]
    fn test_lookback_start_out_of_range() {
        let now = Utc::now();
        let err = lookback_start(now, 200_000_000).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(lookback_start(now, u32::MAX).is_err());
    }
}
