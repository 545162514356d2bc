//! Transaction records and their confirmation sets.

use crate::{Address, Amount, Payload};
use serde::Serialize;
use std::collections::BTreeSet;

/// The set of owners that have confirmed a transaction.
///
/// An owner is either in or out; there is no multiplicity. Serialized order
/// is the byte order of the addresses, so two sets with the same members
/// always serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfirmationSet {
    owners: BTreeSet<Address>,
}

impl ConfirmationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an owner. Returns true if the owner was not already present.
    pub fn insert(&mut self, owner: Address) -> bool {
        self.owners.insert(owner)
    }

    /// Remove an owner. Returns true if the owner was present.
    pub fn remove(&mut self, owner: &Address) -> bool {
        self.owners.remove(owner)
    }

    /// Check if an owner has confirmed.
    pub fn contains(&self, owner: &Address) -> bool {
        self.owners.contains(owner)
    }

    /// Number of confirming owners.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Check if nobody has confirmed.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Why a record refused a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The record has been executed and is frozen.
    #[error("transaction already executed")]
    Frozen,

    /// The owner is already in the confirmation set.
    #[error("owner already confirmed")]
    AlreadyConfirmed,

    /// The owner is not in the confirmation set.
    #[error("owner has not confirmed")]
    NotConfirmed,
}

/// A proposed transfer plus its confirmation state.
///
/// `confirmation_count` is a cached copy of `confirmed_by.len()`. It is
/// recomputed from the set after every mutation and never written on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    to: Address,
    value: Amount,
    payload: Payload,
    executed: bool,
    confirmed_by: ConfirmationSet,
    confirmation_count: u64,
}

impl TransactionRecord {
    /// Create a pending record with no confirmations.
    pub fn new(to: Address, value: Amount, payload: Payload) -> Self {
        Self {
            to,
            value,
            payload,
            executed: false,
            confirmed_by: ConfirmationSet::new(),
            confirmation_count: 0,
        }
    }

    /// Destination identity.
    pub fn to(&self) -> Address {
        self.to
    }

    /// Transfer amount.
    pub fn value(&self) -> Amount {
        self.value
    }

    /// Call data.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Whether the transaction has been executed.
    pub fn executed(&self) -> bool {
        self.executed
    }

    /// Owners that have confirmed.
    pub fn confirmed_by(&self) -> &ConfirmationSet {
        &self.confirmed_by
    }

    /// Number of confirming owners.
    pub fn confirmation_count(&self) -> u64 {
        self.confirmation_count
    }

    /// Check if `owner` has confirmed.
    pub fn is_confirmed_by(&self, owner: &Address) -> bool {
        self.confirmed_by.contains(owner)
    }

    /// Add `owner` to the confirmation set.
    pub fn confirm(&mut self, owner: Address) -> Result<(), RecordError> {
        if self.executed {
            return Err(RecordError::Frozen);
        }
        if !self.confirmed_by.insert(owner) {
            return Err(RecordError::AlreadyConfirmed);
        }
        self.sync_count();
        Ok(())
    }

    /// Remove `owner` from the confirmation set.
    pub fn revoke(&mut self, owner: &Address) -> Result<(), RecordError> {
        if self.executed {
            return Err(RecordError::Frozen);
        }
        if !self.confirmed_by.remove(owner) {
            return Err(RecordError::NotConfirmed);
        }
        self.sync_count();
        Ok(())
    }

    /// Flip the record into its terminal state.
    pub fn mark_executed(&mut self) -> Result<(), RecordError> {
        if self.executed {
            return Err(RecordError::Frozen);
        }
        self.executed = true;
        Ok(())
    }

    fn sync_count(&mut self) {
        self.confirmation_count = self.confirmed_by.len() as u64;
    }
}
