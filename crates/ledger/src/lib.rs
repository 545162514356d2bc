//! Authoritative multi-signature ledger.
//!
//! This crate provides the single-writer state machine that owns the owner
//! set, the confirmation threshold, the balance and the append-only list of
//! proposed transactions.
//!
//! # Transaction lifecycle
//!
//! ```text
//!   submit ──▶ Pending(0) ◀──confirm/revoke──▶ Pending(k) ──execute (k ≥ threshold)──▶ Executed
//! ```
//!
//! Executed is terminal: the record never gains or loses confirmations and
//! cannot be executed again. A failed transfer restores the pre-execute state.
//!
//! All I/O is performed by the runner via returned `Action`s; the external
//! transfer goes through the [`TransferExecutor`] seam.

mod config;
mod snapshot;
mod state;
mod transfer;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::LedgerConfig;
pub use multisig_core::{ConfigError, LedgerError};
pub use snapshot::{LedgerReader, LedgerSnapshot};
pub use state::LedgerState;
pub use transfer::{AcceptAllTransfers, TransferError, TransferExecutor};
