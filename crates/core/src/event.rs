//! Inbound events for the ledger state machine.

use crate::RequestId;
use multisig_types::{Address, Amount, Payload, TxIndex};

/// A privileged operation only an owner may request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerIntent {
    /// Propose a new transaction.
    Submit {
        to: Address,
        value: Amount,
        payload: Payload,
    },

    /// Add the caller's confirmation.
    Confirm { index: TxIndex },

    /// Withdraw the caller's confirmation.
    Revoke { index: TxIndex },

    /// Perform the transfer once enough owners agree.
    Execute { index: TxIndex },
}

impl OwnerIntent {
    /// Get a human-readable name for this intent.
    pub fn type_name(&self) -> &'static str {
        match self {
            OwnerIntent::Submit { .. } => "Submit",
            OwnerIntent::Confirm { .. } => "Confirm",
            OwnerIntent::Revoke { .. } => "Revoke",
            OwnerIntent::Execute { .. } => "Execute",
        }
    }
}

/// Events delivered to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Value transferred directly to the ledger. Anyone may send it.
    ValueReceived {
        request_id: RequestId,
        sender: Address,
        amount: Amount,
    },

    /// An intent from a caller claiming to be an owner.
    IntentSubmitted {
        request_id: RequestId,
        caller: Address,
        intent: OwnerIntent,
    },
}

impl Event {
    /// Get a human-readable name for this event.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::ValueReceived { .. } => "ValueReceived",
            Event::IntentSubmitted { intent, .. } => intent.type_name(),
        }
    }
}
