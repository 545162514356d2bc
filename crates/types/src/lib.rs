//! Core types for the multi-signature ledger.
//!
//! This crate holds the vocabulary shared by the ledger, the projection and
//! the runner: identities, amounts, payloads, transaction records with their
//! confirmation sets, and the notifications the ledger emits.

mod address;
mod codec;
mod identifiers;
mod notification;
mod payload;
mod transaction;

pub use address::{Address, HexError};
pub use codec::{decode_notification, encode_notification, CodecError};
pub use identifiers::{Amount, NetworkId, TxIndex};
pub use notification::{LedgerEvent, Notification, NotificationKind};
pub use payload::Payload;
pub use transaction::{ConfirmationSet, RecordError, TransactionRecord};
