//! Error types for projection maintenance.

use multisig_types::{CodecError, TxIndex};
use thiserror::Error;

/// A notification could not be folded into the projection.
///
/// Every variant means the projection no longer mirrors the ledger. The
/// store marks itself stale and must be re-bootstrapped.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The notification refers to a transaction the projection does not hold.
    #[error("transaction {0} missing from projection")]
    MissingTransaction(TxIndex),

    /// A submit notification reuses an index the projection already holds.
    #[error("transaction {0} already present in projection")]
    DuplicateTransaction(TxIndex),

    /// A revoke would push a confirmation count below zero.
    #[error("confirmation count underflow on transaction {0}")]
    CountUnderflow(TxIndex),

    /// The notification is not the next one in sequence.
    #[error("out of order notification: expected sequence {expected}, got {actual}")]
    OutOfOrder { expected: u64, actual: u64 },

    /// The notification could not be decoded.
    #[error("malformed notification: {0}")]
    Malformed(#[from] CodecError),

    /// The store needs a bootstrap before it can fold.
    #[error("projection is stale and must be re-bootstrapped")]
    Stale,
}
