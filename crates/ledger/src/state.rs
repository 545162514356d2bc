//! Ledger state machine.

use crate::config::LedgerConfig;
use crate::snapshot::{LedgerReader, LedgerSnapshot};
use crate::transfer::{AcceptAllTransfers, TransferError, TransferExecutor};
use multisig_core::{Action, Event, LedgerError, OwnerIntent, RequestId, StateMachine};
use multisig_types::{
    Address, Amount, LedgerEvent, Notification, Payload, RecordError, TransactionRecord, TxIndex,
};
use std::fmt;
use tracing::{debug, warn};

/// The authoritative multi-signature ledger.
///
/// Single writer: every operation takes `&mut self`, so effects of two
/// operations can never interleave. Each accepted operation commits exactly
/// one notification with the next sequence number; each rejected operation
/// changes nothing.
pub struct LedgerState {
    /// Current state. Replaced wholesale on rollback.
    data: LedgerSnapshot,

    /// Performs the external transfer on execute.
    transfer: Box<dyn TransferExecutor>,
}

impl LedgerState {
    /// Create a ledger that accepts every transfer.
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        Self::with_transfer_executor(config, Box::new(AcceptAllTransfers))
    }

    /// Create a ledger with a custom transfer executor.
    pub fn with_transfer_executor(
        config: &LedgerConfig,
        transfer: Box<dyn TransferExecutor>,
    ) -> Result<Self, LedgerError> {
        let owners = config.validate()?;
        debug!(
            owners = owners.len(),
            threshold = config.threshold,
            "Ledger constructed"
        );
        Ok(Self {
            data: LedgerSnapshot::genesis(owners, config.threshold),
            transfer,
        })
    }

    /// Take an immutable copy of the current state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.data.clone()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Operations
    // ═══════════════════════════════════════════════════════════════════════════

    /// Accept value from anyone. Always succeeds.
    ///
    /// The balance saturates at `u128::MAX`.
    pub fn deposit(&mut self, sender: Address, amount: Amount) -> Notification {
        self.data.balance = self.data.balance.saturating_add(amount);
        self.commit(LedgerEvent::Deposit {
            sender,
            amount,
            balance: self.data.balance,
        })
    }

    /// Append a new pending transaction. Owners only.
    pub fn submit(
        &mut self,
        caller: Address,
        to: Address,
        value: Amount,
        payload: Payload,
    ) -> Result<Notification, LedgerError> {
        self.ensure_owner(&caller)?;

        let index = TxIndex(self.data.transactions.len() as u64);
        self.data
            .transactions
            .push_back(TransactionRecord::new(to, value, payload.clone()));

        Ok(self.commit(LedgerEvent::Submit {
            owner: caller,
            index,
            to,
            value,
            payload,
        }))
    }

    /// Add the caller to a pending transaction's confirmation set.
    pub fn confirm(&mut self, caller: Address, index: TxIndex) -> Result<Notification, LedgerError> {
        self.ensure_owner(&caller)?;
        self.pending_mut(index)?
            .confirm(caller)
            .map_err(|e| record_error(e, index))?;

        Ok(self.commit(LedgerEvent::Confirm {
            owner: caller,
            index,
        }))
    }

    /// Remove the caller from a pending transaction's confirmation set.
    pub fn revoke(&mut self, caller: Address, index: TxIndex) -> Result<Notification, LedgerError> {
        self.ensure_owner(&caller)?;
        self.pending_mut(index)?
            .revoke(&caller)
            .map_err(|e| record_error(e, index))?;

        Ok(self.commit(LedgerEvent::Revoke {
            owner: caller,
            index,
        }))
    }

    /// Execute a sufficiently confirmed transaction.
    ///
    /// The record is marked executed before the transfer runs. If the
    /// transfer fails, the ledger is restored to the state it had before the
    /// call and `TransferFailed` is returned.
    pub fn execute(&mut self, caller: Address, index: TxIndex) -> Result<Notification, LedgerError> {
        self.ensure_owner(&caller)?;

        let threshold = self.data.threshold;
        let record = self.pending_mut(index)?;
        if record.confirmation_count() < threshold {
            return Err(LedgerError::InsufficientConfirmations {
                index,
                confirmations: record.confirmation_count(),
                required: threshold,
            });
        }
        let (to, value, payload) = (record.to(), record.value(), record.payload().clone());

        let checkpoint = self.data.clone();
        match self.apply_execution(index, to, value, &payload) {
            Ok(()) => Ok(self.commit(LedgerEvent::Execute {
                owner: caller,
                index,
            })),
            Err(e) => {
                self.data = checkpoint;
                warn!(index = index.0, to = %to, value = %value, error = %e, "Transfer failed, execution rolled back");
                Err(LedgerError::TransferFailed {
                    to,
                    value,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Mark executed, then move value out. Any error leaves partial effects
    /// that the caller must discard.
    fn apply_execution(
        &mut self,
        index: TxIndex,
        to: Address,
        value: Amount,
        payload: &Payload,
    ) -> Result<(), TransferError> {
        if let Some(record) = index
            .as_usize()
            .and_then(|position| self.data.transactions.get_mut(position))
        {
            record
                .mark_executed()
                .map_err(|e| TransferError::Rejected(e.to_string()))?;
        }

        let remaining =
            self.data
                .balance
                .checked_sub(value)
                .ok_or(TransferError::InsufficientBalance {
                    available: self.data.balance,
                    required: value,
                })?;

        self.transfer.transfer(to, value, payload)?;
        self.data.balance = remaining;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════════

    fn ensure_owner(&self, caller: &Address) -> Result<(), LedgerError> {
        if self.data.owners.contains(caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(*caller))
        }
    }

    /// Look up a record that may still change.
    fn pending_mut(&mut self, index: TxIndex) -> Result<&mut TransactionRecord, LedgerError> {
        let record = index
            .as_usize()
            .and_then(|position| self.data.transactions.get_mut(position))
            .ok_or(LedgerError::NotFound(index))?;
        if record.executed() {
            return Err(LedgerError::AlreadyExecuted(index));
        }
        Ok(record)
    }

    fn commit(&mut self, event: LedgerEvent) -> Notification {
        self.data.sequence += 1;
        debug!(
            sequence = self.data.sequence,
            kind = %event.kind(),
            actor = %event.actor(),
            "Committed ledger operation"
        );
        Notification::new(self.data.sequence, event)
    }

    fn apply_intent(
        &mut self,
        caller: Address,
        intent: OwnerIntent,
    ) -> Result<Notification, LedgerError> {
        match intent {
            OwnerIntent::Submit { to, value, payload } => self.submit(caller, to, value, payload),
            OwnerIntent::Confirm { index } => self.confirm(caller, index),
            OwnerIntent::Revoke { index } => self.revoke(caller, index),
            OwnerIntent::Execute { index } => self.execute(caller, index),
        }
    }
}

fn record_error(error: RecordError, index: TxIndex) -> LedgerError {
    match error {
        RecordError::Frozen => LedgerError::AlreadyExecuted(index),
        RecordError::AlreadyConfirmed => LedgerError::AlreadyConfirmed(index),
        RecordError::NotConfirmed => LedgerError::NotYetConfirmed(index),
    }
}

fn resolve(request_id: RequestId, result: Result<Notification, LedgerError>) -> Vec<Action> {
    match result {
        Ok(notification) => vec![
            Action::EmitNotification {
                notification: notification.clone(),
            },
            Action::EmitResult {
                request_id,
                result: Ok(notification),
            },
        ],
        Err(e) => vec![Action::EmitResult {
            request_id,
            result: Err(e),
        }],
    }
}

impl StateMachine for LedgerState {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::ValueReceived {
                request_id,
                sender,
                amount,
            } => resolve(request_id, Ok(self.deposit(sender, amount))),

            Event::IntentSubmitted {
                request_id,
                caller,
                intent,
            } => {
                let name = intent.type_name();
                let result = self.apply_intent(caller, intent);
                if let Err(e) = &result {
                    warn!(request = %request_id, intent = name, caller = %caller, error = %e, "Rejected intent");
                }
                resolve(request_id, result)
            }
        }
    }
}

impl LedgerReader for LedgerState {
    fn owners(&self) -> Vec<Address> {
        self.data.owners()
    }

    fn is_owner(&self, address: &Address) -> bool {
        self.data.is_owner(address)
    }

    fn threshold(&self) -> u64 {
        self.data.threshold()
    }

    fn balance(&self) -> Amount {
        self.data.balance()
    }

    fn transaction_count(&self) -> u64 {
        self.data.transaction_count()
    }

    fn transaction(&self, index: TxIndex) -> Option<&TransactionRecord> {
        self.data.transaction(index)
    }

    fn last_sequence(&self) -> u64 {
        self.data.last_sequence()
    }
}

impl fmt::Debug for LedgerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerState")
            .field("owners", &self.data.owners.len())
            .field("threshold", &self.data.threshold)
            .field("balance", &self.data.balance)
            .field("transactions", &self.data.transactions.len())
            .field("sequence", &self.data.sequence)
            .finish()
    }
}
