//! Carries out a decision against the connection store and notifier

use tracing::{error, info, warn};

use super::decision::Decision;
use crate::Result;
use crate::connection::{ConnectionId, ConnectionStatus};
use crate::ports::{ConnectionStore, JobHistory, NotificationKind, Notifier};

/// What applying a decision did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionOutcome {
    /// The connection was set to inactive
    pub disabled: bool,
    /// A notification was accepted by the channel
    pub notified: bool,
}

/// Side-effecting half of the policy
pub struct ActionApplier<'a> {
    history: &'a dyn JobHistory,
    connections: &'a dyn ConnectionStore,
    notifier: &'a dyn Notifier,
}

impl<'a> ActionApplier<'a> {
    /// Create an applier over the given collaborators
    #[must_use]
    pub fn new(
        history: &'a dyn JobHistory,
        connections: &'a dyn ConnectionStore,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            history,
            connections,
            notifier,
        }
    }

    /// Apply `decision` to `connection_id`.
    ///
    /// A failed status write is returned as an error. A failed notification
    /// is only logged; it never undoes the status write.
    pub async fn apply(&self, connection_id: ConnectionId, decision: Decision) -> Result<ActionOutcome> {
        match decision {
            Decision::NoOp => Ok(ActionOutcome::default()),
            Decision::Warn(reason) => {
                info!(%connection_id, ?reason, "Connection is at risk of being disabled");
                let notified = self.notify(NotificationKind::Warning, connection_id).await;
                Ok(ActionOutcome {
                    disabled: false,
                    notified,
                })
            }
            Decision::Disable(reason) => {
                self.connections
                    .set_status(connection_id, ConnectionStatus::Inactive)
                    .await?;
                warn!(%connection_id, ?reason, "Connection disabled after repeated failures");
                let notified = self.notify(NotificationKind::Disabled, connection_id).await;
                Ok(ActionOutcome {
                    disabled: true,
                    notified,
                })
            }
        }
    }

    async fn notify(&self, kind: NotificationKind, connection_id: ConnectionId) -> bool {
        let last_job = match self.history.last_replication_job(connection_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                error!(
                    %connection_id,
                    %kind,
                    "No replication job to reference, skipping notification"
                );
                return false;
            }
            Err(e) => {
                error!(%connection_id, %kind, error = %e, "Failed to look up last replication job");
                return false;
            }
        };

        match self.notifier.send(kind, connection_id, &last_job).await {
            Ok(()) => true,
            Err(e) => {
                error!(%connection_id, %kind, error = %e, "Failed to send notification");
                false
            }
        }
    }
}
