//! Outbound actions produced by the ledger state machine.

use crate::{LedgerError, RequestId};
use multisig_types::Notification;

/// Actions for the runner to perform.
///
/// The state machine never talks to subscribers or callers directly; the
/// runner executes these in the order they were returned.
#[derive(Debug, Clone)]
pub enum Action {
    /// Publish a committed state change to every subscriber.
    EmitNotification { notification: Notification },

    /// Resolve the caller's pending request.
    ///
    /// On success carries the same notification that was emitted, so a
    /// submitter can read the assigned index from it.
    EmitResult {
        request_id: RequestId,
        result: Result<Notification, LedgerError>,
    },
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::EmitNotification { .. } => "EmitNotification",
            Action::EmitResult { .. } => "EmitResult",
        }
    }

    /// Check if this action publishes a notification.
    pub fn is_notification(&self) -> bool {
        matches!(self, Action::EmitNotification { .. })
    }
}
