//! Participant identity type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 20-byte participant identity.
///
/// Text form is `0x` followed by 40 lowercase hex characters. Parsing accepts
/// either case, so two spellings of the same identity compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// Size of an address in bytes.
    pub const BYTES: usize = 20;

    /// The zero address. Never a valid owner.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create an address whose low 8 bytes hold `n` (big-endian).
    ///
    /// Handy for fixtures and scenario files where readable identities matter
    /// more than realistic ones.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Parse an address from its hex text form, with or without `0x`.
    pub fn from_hex(text: &str) -> Result<Self, HexError> {
        let digits = strip_hex_prefix(text);
        if digits.len() != Self::BYTES * 2 {
            return Err(HexError::InvalidLength {
                expected: Self::BYTES * 2,
                actual: digits.len(),
            });
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| HexError::InvalidHex)?;
        Ok(Self(bytes))
    }

    /// Convert to `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

pub(crate) fn strip_hex_prefix(text: &str) -> &str {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(self.0);
        write!(f, "Address(0x{}..{})", &hex[..6], &hex[36..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Address {
    type Error = HexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_hex()
    }
}

/// Errors that can occur when parsing hex strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    /// Invalid hex string length.
    #[error("Invalid hex length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid hex characters.
    #[error("Invalid hex string")]
    InvalidHex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        let lower = Address::from_hex("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        let upper = Address::from_hex("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(
            upper.to_string(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn test_parse_without_prefix() {
        let address = Address::from_hex("0000000000000000000000000000000000000007").unwrap();
        assert_eq!(address, Address::from_low_u64(7));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            Address::from_hex("0x1234"),
            Err(HexError::InvalidLength {
                expected: 40,
                actual: 4
            })
        );
        assert_eq!(
            Address::from_hex("0xzz00000000000000000000000000000000000000"),
            Err(HexError::InvalidHex)
        );
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_low_u64(1).is_zero());
        assert_eq!(
            Address::from_hex("0x0000000000000000000000000000000000000000").unwrap(),
            Address::ZERO
        );
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let address = Address::from_low_u64(0xff);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0x00000000000000000000000000000000000000ff\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
