//! Projection state and its bootstrap from a ledger read.

use multisig_ledger::LedgerReader;
use multisig_types::{Address, Amount, Payload, TxIndex};
use serde::Serialize;
use tracing::info;

/// One transaction as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedTransaction {
    pub index: TxIndex,
    pub to: Address,
    pub value: Amount,
    pub payload: Payload,
    pub executed: bool,
    pub confirmation_count: u64,
    /// Whether the viewer is among the confirming owners.
    pub is_confirmed_by_current_account: bool,
}

/// Denormalised mirror of ledger state for one viewer.
///
/// Transactions are held newest first. The transaction at index `i` sits at
/// position `transaction_count - 1 - i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionState {
    /// Identity the per-account flags are computed for.
    pub viewer: Option<Address>,
    /// Whether the viewer is one of the owners.
    pub viewer_is_owner: bool,
    pub owners: Vec<Address>,
    pub threshold: u64,
    pub balance: Amount,
    pub transaction_count: u64,
    pub transactions: Vec<ProjectedTransaction>,
    /// Sequence of the last notification reflected in this state.
    pub sequence: u64,
}

impl ProjectionState {
    /// Build a projection from a full read of ledger state.
    ///
    /// The ledger's last sequence becomes the bootstrap point; only
    /// notifications after it may be folded in.
    pub fn bootstrap(reader: &dyn LedgerReader, viewer: Option<Address>) -> Self {
        let count = reader.transaction_count();
        let transactions: Vec<ProjectedTransaction> = (0..count)
            .rev()
            .map(TxIndex)
            .filter_map(|index| {
                reader.transaction(index).map(|tx| ProjectedTransaction {
                    index,
                    to: tx.to(),
                    value: tx.value(),
                    payload: tx.payload().clone(),
                    executed: tx.executed(),
                    confirmation_count: tx.confirmation_count(),
                    is_confirmed_by_current_account: viewer
                        .is_some_and(|v| reader.is_confirmed_by(index, &v)),
                })
            })
            .collect();

        let state = Self {
            viewer,
            viewer_is_owner: viewer.is_some_and(|v| reader.is_owner(&v)),
            owners: reader.owners(),
            threshold: reader.threshold(),
            balance: reader.balance(),
            transaction_count: transactions.len() as u64,
            transactions,
            sequence: reader.last_sequence(),
        };

        info!(
            sequence = state.sequence,
            transactions = state.transaction_count,
            viewer = ?state.viewer,
            "Projection bootstrapped"
        );
        state
    }

    /// Get a transaction by ledger index.
    pub fn transaction(&self, index: TxIndex) -> Option<&ProjectedTransaction> {
        self.position(index).map(|pos| &self.transactions[pos])
    }

    pub(crate) fn transaction_mut(&mut self, index: TxIndex) -> Option<&mut ProjectedTransaction> {
        self.position(index).map(|pos| &mut self.transactions[pos])
    }

    fn position(&self, index: TxIndex) -> Option<usize> {
        if index.0 >= self.transaction_count {
            return None;
        }
        let pos = (self.transaction_count - 1 - index.0) as usize;
        self.transactions
            .get(pos)
            .filter(|tx| tx.index == index)
            .map(|_| pos)
    }

    /// Transactions the viewer could still confirm.
    pub fn awaiting_viewer(&self) -> impl Iterator<Item = &ProjectedTransaction> {
        let eligible = self.viewer_is_owner;
        self.transactions
            .iter()
            .filter(move |tx| eligible && !tx.executed && !tx.is_confirmed_by_current_account)
    }

    /// Pending transactions that have reached the threshold.
    pub fn ready_to_execute(&self) -> impl Iterator<Item = &ProjectedTransaction> {
        let threshold = self.threshold;
        self.transactions
            .iter()
            .filter(move |tx| !tx.executed && tx.confirmation_count >= threshold)
    }
}
