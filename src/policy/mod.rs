//! Auto-disable policy for failing connections.
//!
//! Invoked by the orchestrator after each sync, the policy looks at the
//! connection's recent replication history and either disables it, warns that
//! it will be disabled, or does nothing.
//!
//! ```text
//! feature gate → history window → streak ─┐
//!                                         ├→ decision → status write / notification
//!                  first-job age → window ┘
//! ```
//!
//! Collaborator calls are strictly sequential and each invocation issues at
//! most one status write and at most one notification. Retries, timeouts and
//! per-connection exclusivity belong to the caller.

mod apply;
mod decision;
mod streak;
mod window;

pub use apply::{ActionApplier, ActionOutcome};
pub use decision::{Decision, DecisionMerger, Reason, WarningTrigger};
pub use streak::consecutive_failures;
pub use window::{HistoryWindowFetcher, WindowAgeAnalyzer, lookback_start, old_enough};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Result;
use crate::config::PolicyThresholds;
use crate::connection::ConnectionId;
use crate::ports::{ConnectionStore, FeatureFlags, JobHistory, Notifier};

/// Invocation input from the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDisableInput {
    /// Connection to evaluate
    pub connection_id: ConnectionId,
    /// Evaluation time; lookback windows end here
    pub now: DateTime<Utc>,
}

/// Invocation output returned to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDisableOutput {
    /// The connection was set to inactive by this invocation
    pub disabled: bool,
    /// Decision that was applied
    pub decision: Decision,
    /// A notification was accepted by the channel
    pub notified: bool,
}

impl AutoDisableOutput {
    fn no_op() -> Self {
        Self {
            disabled: false,
            decision: Decision::NoOp,
            notified: false,
        }
    }
}

/// The connection health policy, wired to its collaborators
pub struct AutoDisablePolicy {
    feature_flags: Arc<dyn FeatureFlags>,
    thresholds: PolicyThresholds,
    history: Arc<dyn JobHistory>,
    connections: Arc<dyn ConnectionStore>,
    notifier: Arc<dyn Notifier>,
}

impl AutoDisablePolicy {
    /// Create a policy
    #[must_use]
    pub fn new(
        feature_flags: Arc<dyn FeatureFlags>,
        thresholds: PolicyThresholds,
        history: Arc<dyn JobHistory>,
        connections: Arc<dyn ConnectionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            feature_flags,
            thresholds,
            history,
            connections,
            notifier,
        }
    }

    /// Thresholds in effect
    #[must_use]
    pub fn thresholds(&self) -> &PolicyThresholds {
        &self.thresholds
    }

    /// Decide what to do with a connection without acting on it.
    ///
    /// Returns [`Decision::NoOp`] without touching the history store when the
    /// feature gate is off.
    pub async fn decide(&self, input: AutoDisableInput) -> Result<Decision> {
        if !self.feature_flags.auto_disables_failing_connections() {
            debug!(connection_id = %input.connection_id, "Auto-disable turned off, skipping");
            return Ok(Decision::NoOp);
        }
        DecisionMerger::new(self.history.as_ref(), self.thresholds)
            .decide(input.connection_id, input.now)
            .await
    }

    /// Evaluate a connection and apply the resulting decision
    #[tracing::instrument(skip(self), fields(connection_id = %input.connection_id))]
    pub async fn auto_disable_failing_connection(
        &self,
        input: AutoDisableInput,
    ) -> Result<AutoDisableOutput> {
        let decision = self.decide(input).await?;
        debug!(decision = decision.label(), "Connection evaluated");

        if decision == Decision::NoOp {
            return Ok(AutoDisableOutput::no_op());
        }

        let outcome = ActionApplier::new(
            self.history.as_ref(),
            self.connections.as_ref(),
            self.notifier.as_ref(),
        )
        .apply(input.connection_id, decision)
        .await?;

        info!(
            decision = decision.label(),
            disabled = outcome.disabled,
            notified = outcome.notified,
            "Auto-disable decision applied"
        );

        Ok(AutoDisableOutput {
            disabled: outcome.disabled,
            decision,
            notified: outcome.notified,
        })
    }
}
