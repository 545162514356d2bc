//! Core types for the multi-signature ledger: events, actions, errors, and
//! the `StateMachine` trait.
//!
//! # Architecture
//!
//! ```text
//! caller ──Event──▶ StateMachine::handle ──Vec<Action>──▶ runner
//!                                                          │
//!                         EmitNotification ◀───────────────┤ publish to subscribers
//!                         EmitResult       ◀───────────────┘ resolve RequestId
//! ```

mod action;
mod error;
mod event;
mod request;
mod traits;

pub use action::Action;
pub use error::{ConfigError, LedgerError};
pub use event::{Event, OwnerIntent};
pub use request::RequestId;
pub use traits::StateMachine;
