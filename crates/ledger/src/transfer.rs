//! The external transfer performed when a transaction executes.

use multisig_types::{Address, Amount, Payload};
use thiserror::Error;

/// Why a transfer did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The ledger holds less than the transfer value.
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    /// The recipient refused the transfer.
    #[error("recipient rejected transfer: {0}")]
    Rejected(String),
}

/// Performs the transfer of value (and call data) to a destination.
///
/// The ledger calls this after marking the transaction executed and after
/// checking its own balance. Returning an error rolls the whole execution
/// back. Implementations receive no handle to the ledger, so they cannot
/// re-enter it mid-execution.
pub trait TransferExecutor: Send {
    /// Deliver `value` and `payload` to `to`.
    fn transfer(&mut self, to: Address, value: Amount, payload: &Payload)
        -> Result<(), TransferError>;
}

/// Executor that accepts every transfer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllTransfers;

impl TransferExecutor for AcceptAllTransfers {
    fn transfer(
        &mut self,
        _to: Address,
        _value: Amount,
        _payload: &Payload,
    ) -> Result<(), TransferError> {
        Ok(())
    }
}
