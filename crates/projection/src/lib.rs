//! Read-optimised projection of ledger state.
//!
//! The projection never originates state. It is initialised from a full
//! ledger read (bootstrap) and then advanced by folding notifications in
//! sequence order.
//!
//! # Architecture
//!
//! ```text
//! LedgerReader ──bootstrap──▶ ProjectionState ──fold(n₁)──▶ … ──fold(nₖ)──▶ ProjectionState
//!                                  ▲
//!                    ProjectionStore (single writer, stale → re-bootstrap)
//! ```
//!
//! # Determinism
//!
//! [`fold`] is a pure function: replaying the same notifications from the
//! same bootstrap always produces the same state.

mod error;
mod fold;
mod state;
mod store;

pub use error::ProjectionError;
pub use fold::{fold, replay};
pub use state::{ProjectedTransaction, ProjectionState};
pub use store::{Applied, ProjectionStore, StoreStatus};
