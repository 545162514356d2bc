//! Notification encoding and decoding for transport.
//!
//! # Wire Format
//!
//! Notifications are JSON objects, externally tagged by kind:
//!
//! ```text
//! {"sequence":3,"event":{"Confirm":{"owner":"0x…","index":0}}}
//! ```
//!
//! Addresses and payloads travel as `0x` hex strings, amounts as decimal
//! strings.

use crate::Notification;
use thiserror::Error;

/// Errors that can occur during notification encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Message too short")]
    MessageTooShort,

    #[error("JSON decode error: {0}")]
    Decode(String),

    #[error("JSON encode error: {0}")]
    Encode(String),
}

/// Encode a notification to wire format.
pub fn encode_notification(notification: &Notification) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(notification).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a notification from wire format.
pub fn decode_notification(data: &[u8]) -> Result<Notification, CodecError> {
    if data.is_empty() {
        return Err(CodecError::MessageTooShort);
    }
    serde_json::from_slice(data).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, Amount, LedgerEvent, Payload, TxIndex};

    #[test]
    fn test_submit_wire_shape() {
        let notification = Notification::new(
            1,
            LedgerEvent::Submit {
                owner: Address::from_low_u64(1),
                index: TxIndex(0),
                to: Address::from_low_u64(4),
                value: Amount(0),
                payload: Payload::from_hex("0x0123").unwrap(),
            },
        );

        let bytes = encode_notification(&notification).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"Submit\""));
        assert!(text.contains("\"payload\":\"0x0123\""));
        assert!(text.contains("\"value\":\"0\""));

        assert_eq!(decode_notification(&bytes).unwrap(), notification);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_notification(b""),
            Err(CodecError::MessageTooShort)
        ));
        assert!(matches!(
            decode_notification(b"{\"sequence\":1,\"event\":{\"Explode\":{}}}"),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(
            decode_notification(
                b"{\"sequence\":1,\"event\":{\"Confirm\":{\"owner\":\"0x12\",\"index\":0}}}"
            ),
            Err(CodecError::Decode(_))
        ));
    }
}
