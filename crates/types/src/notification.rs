//! Ordered records of committed ledger state changes.

use crate::{Address, Amount, Payload, TxIndex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five kinds of committed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NotificationKind {
    Deposit,
    Submit,
    Confirm,
    Revoke,
    Execute,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationKind::Deposit => "Deposit",
            NotificationKind::Submit => "Submit",
            NotificationKind::Confirm => "Confirm",
            NotificationKind::Revoke => "Revoke",
            NotificationKind::Execute => "Execute",
        };
        f.write_str(name)
    }
}

/// A committed state change and the fields needed to fold it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Value arrived. `balance` is the new total, not a delta.
    Deposit {
        sender: Address,
        amount: Amount,
        balance: Amount,
    },

    /// A new transaction was appended at `index`.
    Submit {
        owner: Address,
        index: TxIndex,
        to: Address,
        value: Amount,
        payload: Payload,
    },

    /// `owner` joined the confirmation set of `index`.
    Confirm { owner: Address, index: TxIndex },

    /// `owner` left the confirmation set of `index`.
    Revoke { owner: Address, index: TxIndex },

    /// `index` was executed by `owner`.
    Execute { owner: Address, index: TxIndex },
}

impl LedgerEvent {
    /// Get the kind tag of this event.
    pub fn kind(&self) -> NotificationKind {
        match self {
            LedgerEvent::Deposit { .. } => NotificationKind::Deposit,
            LedgerEvent::Submit { .. } => NotificationKind::Submit,
            LedgerEvent::Confirm { .. } => NotificationKind::Confirm,
            LedgerEvent::Revoke { .. } => NotificationKind::Revoke,
            LedgerEvent::Execute { .. } => NotificationKind::Execute,
        }
    }

    /// Get the transaction index this event refers to, if any.
    pub fn tx_index(&self) -> Option<TxIndex> {
        match self {
            LedgerEvent::Deposit { .. } => None,
            LedgerEvent::Submit { index, .. }
            | LedgerEvent::Confirm { index, .. }
            | LedgerEvent::Revoke { index, .. }
            | LedgerEvent::Execute { index, .. } => Some(*index),
        }
    }

    /// Get the identity that caused this event.
    pub fn actor(&self) -> Address {
        match self {
            LedgerEvent::Deposit { sender, .. } => *sender,
            LedgerEvent::Submit { owner, .. }
            | LedgerEvent::Confirm { owner, .. }
            | LedgerEvent::Revoke { owner, .. }
            | LedgerEvent::Execute { owner, .. } => *owner,
        }
    }
}

/// A ledger event stamped with its position in the ledger's total order.
///
/// Sequences start at 1 and increase by exactly one per committed operation,
/// so a consumer can detect both gaps and replays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub sequence: u64,
    pub event: LedgerEvent,
}

impl Notification {
    /// Create a new notification.
    pub fn new(sequence: u64, event: LedgerEvent) -> Self {
        Self { sequence, event }
    }

    /// Get the kind tag of the wrapped event.
    pub fn kind(&self) -> NotificationKind {
        self.event.kind()
    }
}
