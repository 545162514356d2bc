//! Point-in-time views of ledger state.

use indexmap::IndexSet;
use multisig_types::{Address, Amount, TransactionRecord, TxIndex};
use std::sync::Arc;

/// Read access to ledger state, used to bootstrap projections.
///
/// Implemented by the live [`crate::LedgerState`] and by [`LedgerSnapshot`].
pub trait LedgerReader {
    /// Owners in construction order.
    fn owners(&self) -> Vec<Address>;

    /// Check owner membership.
    fn is_owner(&self, address: &Address) -> bool;

    /// Required confirmations.
    fn threshold(&self) -> u64;

    /// Current balance.
    fn balance(&self) -> Amount;

    /// Number of submitted transactions.
    fn transaction_count(&self) -> u64;

    /// Get a transaction by index.
    fn transaction(&self, index: TxIndex) -> Option<&TransactionRecord>;

    /// Check whether `owner` confirmed the transaction at `index`.
    ///
    /// Returns false for unknown indices.
    fn is_confirmed_by(&self, index: TxIndex, owner: &Address) -> bool {
        self.transaction(index)
            .is_some_and(|tx| tx.is_confirmed_by(owner))
    }

    /// Sequence of the last committed operation (0 before the first).
    fn last_sequence(&self) -> u64;
}

/// An immutable copy of ledger state.
///
/// Cloning is cheap: the owner set is shared and the transaction list is a
/// persistent vector, so taking a snapshot after every commit costs
/// O(log n) rather than a full copy.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub(crate) owners: Arc<IndexSet<Address>>,
    pub(crate) threshold: u64,
    pub(crate) balance: Amount,
    pub(crate) transactions: im::Vector<TransactionRecord>,
    pub(crate) sequence: u64,
}

impl LedgerSnapshot {
    pub(crate) fn genesis(owners: IndexSet<Address>, threshold: u64) -> Self {
        Self {
            owners: Arc::new(owners),
            threshold,
            balance: Amount::ZERO,
            transactions: im::Vector::new(),
            sequence: 0,
        }
    }

    /// Iterate over transactions in index order.
    pub fn transactions(&self) -> impl Iterator<Item = (TxIndex, &TransactionRecord)> {
        self.transactions
            .iter()
            .enumerate()
            .map(|(i, tx)| (TxIndex(i as u64), tx))
    }
}

impl LedgerReader for LedgerSnapshot {
    fn owners(&self) -> Vec<Address> {
        self.owners.iter().copied().collect()
    }

    fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    fn threshold(&self) -> u64 {
        self.threshold
    }

    fn balance(&self) -> Amount {
        self.balance
    }

    fn transaction_count(&self) -> u64 {
        self.transactions.len() as u64
    }

    fn transaction(&self, index: TxIndex) -> Option<&TransactionRecord> {
        index
            .as_usize()
            .and_then(|position| self.transactions.get(position))
    }

    fn last_sequence(&self) -> u64 {
        self.sequence
    }
}
