//! Error types for ledger operations.

use multisig_types::{Address, Amount, TxIndex};
use thiserror::Error;

/// Why a ledger could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The owner set is empty.
    #[error("owner set is empty")]
    NoOwners,

    /// The confirmation threshold is zero.
    #[error("confirmation threshold must be positive")]
    ZeroThreshold,

    /// The confirmation threshold exceeds the owner count.
    #[error("confirmation threshold {threshold} exceeds owner count {owners}")]
    ThresholdTooLarge { threshold: u64, owners: usize },

    /// The same owner appears twice.
    #[error("duplicate owner {0}")]
    DuplicateOwner(Address),

    /// The zero address appears among the owners.
    #[error("zero address cannot be an owner")]
    ZeroAddress,
}

/// Why the ledger rejected an operation.
///
/// A rejected operation leaves the ledger exactly as it was and emits no
/// notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A non-owner attempted a privileged operation.
    #[error("{0} is not an owner")]
    Unauthorized(Address),

    /// No transaction at this index.
    #[error("transaction {0} does not exist")]
    NotFound(TxIndex),

    /// The transaction is already executed and frozen.
    #[error("transaction {0} already executed")]
    AlreadyExecuted(TxIndex),

    /// The caller already confirmed this transaction.
    #[error("transaction {0} already confirmed by caller")]
    AlreadyConfirmed(TxIndex),

    /// The caller has not confirmed this transaction.
    #[error("transaction {0} not confirmed by caller")]
    NotYetConfirmed(TxIndex),

    /// Not enough owners have confirmed.
    #[error("transaction {index} has {confirmations} of {required} required confirmations")]
    InsufficientConfirmations {
        index: TxIndex,
        confirmations: u64,
        required: u64,
    },

    /// The transfer failed; the execution was rolled back.
    #[error("transfer of {value} to {to} failed: {reason}")]
    TransferFailed {
        to: Address,
        value: Amount,
        reason: String,
    },

    /// The ledger could not be constructed.
    #[error("invalid construction: {0}")]
    InvalidConstruction(#[from] ConfigError),

    /// The runner driving the ledger has shut down.
    #[error("ledger runner stopped")]
    RunnerStopped,
}
