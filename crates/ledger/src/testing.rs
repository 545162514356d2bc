//! Transfer executors for tests.

use crate::transfer::{TransferError, TransferExecutor};
use multisig_types::{Address, Amount, Payload};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Accepts every transfer and remembers it.
///
/// Clones share the same log, so a test can keep one handle and give the
/// other to the ledger.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransfers {
    log: Arc<Mutex<Vec<(Address, Amount, Payload)>>>,
}

impl RecordingTransfers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destinations and amounts in the order they were paid.
    pub fn transfers(&self) -> Vec<(Address, Amount)> {
        self.log.lock().iter().map(|(to, v, _)| (*to, *v)).collect()
    }

    /// Payloads in the order they were delivered.
    pub fn payloads(&self) -> Vec<Payload> {
        self.log.lock().iter().map(|(_, _, p)| p.clone()).collect()
    }
}

impl TransferExecutor for RecordingTransfers {
    fn transfer(
        &mut self,
        to: Address,
        value: Amount,
        payload: &Payload,
    ) -> Result<(), TransferError> {
        self.log.lock().push((to, value, payload.clone()));
        Ok(())
    }
}

/// Rejects transfers to a fixed set of destinations.
#[derive(Debug, Clone, Default)]
pub struct FailingTransfers {
    rejected: BTreeSet<Address>,
}

impl FailingTransfers {
    /// Reject every transfer to `to`.
    pub fn rejecting(to: Address) -> Self {
        Self {
            rejected: BTreeSet::from([to]),
        }
    }
}

impl TransferExecutor for FailingTransfers {
    fn transfer(
        &mut self,
        to: Address,
        _value: Amount,
        _payload: &Payload,
    ) -> Result<(), TransferError> {
        if self.rejected.contains(&to) {
            Err(TransferError::Rejected(format!("{to} refuses payment")))
        } else {
            Ok(())
        }
    }
}
