//! Test helpers for the multi-signature ledger.
//!
//! Fixed identities, a standard three-owner ledger, and a recorded history
//! that exercises every notification kind.

use multisig_ledger::{LedgerConfig, LedgerState};
use multisig_types::{Address, Amount, Notification, Payload, TxIndex};

pub use multisig_ledger::testing::{FailingTransfers, RecordingTransfers};

/// First owner.
pub const OWNER_A: u64 = 1;
/// Second owner.
pub const OWNER_B: u64 = 2;
/// Third owner.
pub const OWNER_C: u64 = 3;
/// Not an owner.
pub const OUTSIDER: u64 = 99;

/// Readable fixture identity.
pub fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

/// Owners A, B, C with a threshold of 2.
pub fn three_owner_config() -> LedgerConfig {
    LedgerConfig::new(vec![addr(OWNER_A), addr(OWNER_B), addr(OWNER_C)], 2)
}

/// A fresh ledger over [`three_owner_config`].
pub fn three_owner_ledger() -> LedgerState {
    LedgerState::new(&three_owner_config()).expect("fixture config is valid")
}

/// Drive a fresh three-owner ledger through every notification kind.
///
/// Ends with balance 60, transaction 0 executed (confirmed by A and B) and
/// transaction 1 pending with only C's confirmation.
pub fn ledger_with_history() -> (LedgerState, Vec<Notification>) {
    let mut ledger = three_owner_ledger();
    let (a, b, c) = (addr(OWNER_A), addr(OWNER_B), addr(OWNER_C));

    let log = vec![
        ledger.deposit(addr(OUTSIDER), Amount(100)),
        ledger
            .submit(a, addr(7), Amount(40), Payload::new(vec![0x01, 0x23]))
            .expect("owner submit"),
        ledger
            .submit(b, addr(8), Amount(5), Payload::empty())
            .expect("owner submit"),
        ledger.confirm(a, TxIndex(0)).expect("first confirm"),
        ledger.confirm(b, TxIndex(0)).expect("first confirm"),
        ledger.confirm(b, TxIndex(1)).expect("first confirm"),
        ledger.revoke(b, TxIndex(1)).expect("revoke own confirm"),
        ledger.confirm(c, TxIndex(1)).expect("first confirm"),
        ledger.execute(c, TxIndex(0)).expect("threshold met"),
    ];
    (ledger, log)
}
