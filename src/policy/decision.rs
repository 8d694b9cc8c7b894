//! Decision merging: two failure signals in, one outcome out.
//!
//! Precedence, first match wins:
//!
//! 1. streak `>= M`                                   → disable
//! 2. only failures for `N` days, first job `>= N` old → disable
//! 3. streak hits the warning trigger around `M / 2`  → warn
//! 4. only failures for `N / 2` days, first job old enough → warn
//! 5. otherwise                                       → no-op
//!
//! The full window is fetched once and shared by rules 1–3. The half window
//! is only fetched when rule 4 is reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::streak::consecutive_failures;
use super::window::{HistoryWindowFetcher, WindowAgeAnalyzer};
use crate::Result;
use crate::config::PolicyThresholds;
use crate::connection::ConnectionId;
use crate::ports::JobHistory;

/// When the streak warning fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WarningTrigger {
    /// Only when the streak is exactly `M / 2`, so the warning goes out once
    #[default]
    ExactMidpoint,
    /// On every run whose streak is in `[M / 2, M)`
    FromMidpoint,
}

impl WarningTrigger {
    /// Whether a streak of `consecutive_failures` warrants a warning
    #[must_use]
    pub fn should_warn(self, consecutive_failures: u32, thresholds: &PolicyThresholds) -> bool {
        let half = thresholds.warning_failed_jobs_in_a_row();
        if consecutive_failures == 0 {
            return false;
        }
        match self {
            Self::ExactMidpoint => consecutive_failures == half,
            Self::FromMidpoint => {
                consecutive_failures >= half
                    && consecutive_failures < thresholds.max_failed_jobs_in_a_row
            }
        }
    }
}

/// Which signal produced a warning or a disable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Reason {
    /// Too many failed jobs in a row
    FailureStreak {
        /// Streak length observed
        consecutive_failures: u32,
    },
    /// Nothing but failed jobs for a number of days
    OnlyFailures {
        /// Lookback that contained only failures
        days: u32,
    },
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    /// Nothing to do
    NoOp,
    /// Notify that the connection is heading toward being disabled
    Warn(Reason),
    /// Deactivate the connection and notify
    Disable(Reason),
}

impl Decision {
    /// Short label for logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoOp => "no_op",
            Self::Warn(_) => "warn",
            Self::Disable(_) => "disable",
        }
    }
}

/// Runs both analyzers against the history store and merges their output
pub struct DecisionMerger<'a> {
    history: &'a dyn JobHistory,
    thresholds: PolicyThresholds,
}

impl<'a> DecisionMerger<'a> {
    /// Create a merger reading from `history`
    #[must_use]
    pub fn new(history: &'a dyn JobHistory, thresholds: PolicyThresholds) -> Self {
        Self {
            history,
            thresholds,
        }
    }

    /// Classify the connection's recent history
    pub async fn decide(&self, connection_id: ConnectionId, now: DateTime<Utc>) -> Result<Decision> {
        let max_failed = self.thresholds.max_failed_jobs_in_a_row;
        let max_days = self.thresholds.max_days_of_only_failed_jobs;

        let fetcher = HistoryWindowFetcher::new(self.history, connection_id, now);
        let window = fetcher.fetch_window(max_days).await?;
        let streak = consecutive_failures(&window);
        debug!(%connection_id, streak, max_failed, "Computed failure streak");

        // A most-recent success, an empty window or a cancelled-only window
        // means neither signal can fire.
        if streak == 0 {
            return Ok(Decision::NoOp);
        }

        if streak >= max_failed {
            return Ok(Decision::Disable(Reason::FailureStreak {
                consecutive_failures: streak,
            }));
        }

        let mut analyzer = WindowAgeAnalyzer::new(&fetcher);
        if analyzer.check(&window, max_days).await? {
            return Ok(Decision::Disable(Reason::OnlyFailures { days: max_days }));
        }

        if self.thresholds.warning_trigger.should_warn(streak, &self.thresholds) {
            return Ok(Decision::Warn(Reason::FailureStreak {
                consecutive_failures: streak,
            }));
        }

        let warning_days = self.thresholds.warning_days_of_only_failed_jobs();
        if analyzer.only_failures_and_old_enough(warning_days).await? {
            return Ok(Decision::Warn(Reason::OnlyFailures { days: warning_days }));
        }

        Ok(Decision::NoOp)
    }
}
