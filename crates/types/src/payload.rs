//! Opaque call data carried by a transaction.

use crate::address::{strip_hex_prefix, HexError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque byte sequence attached to a transaction.
///
/// Text form is `0x`-prefixed hex; `"0x"` is the empty payload.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Create a payload from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The empty payload.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Parse from hex text, with or without `0x`.
    pub fn from_hex(text: &str) -> Result<Self, HexError> {
        let digits = strip_hex_prefix(text);
        if digits.len() % 2 != 0 {
            return Err(HexError::InvalidLength {
                expected: digits.len() + 1,
                actual: digits.len(),
            });
        }
        hex::decode(digits)
            .map(Self)
            .map_err(|_| HexError::InvalidHex)
    }

    /// Convert to `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({})", self.to_hex())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Payload {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Payload {
    type Error = HexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Payload> for String {
    fn from(payload: Payload) -> Self {
        payload.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_forms() {
        let payload = Payload::from_hex("0x0123").unwrap();
        assert_eq!(payload.as_bytes(), &[0x01, 0x23]);
        assert_eq!(payload.to_string(), "0x0123");

        assert!(Payload::from_hex("0x").unwrap().is_empty());
        assert_eq!(Payload::empty().to_hex(), "0x");
    }

    #[test]
    fn test_odd_length_rejected() {
        assert!(matches!(
            Payload::from_hex("0x123"),
            Err(HexError::InvalidLength { .. })
        ));
        assert_eq!(Payload::from_hex("0xgg"), Err(HexError::InvalidHex));
    }
}
