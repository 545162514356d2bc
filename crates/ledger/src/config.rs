//! Ledger construction parameters.

use indexmap::IndexSet;
use multisig_core::ConfigError;
use multisig_types::Address;
use serde::Deserialize;

/// Configuration for a new ledger.
///
/// Both fields are fixed for the ledger's lifetime; there is no operation to
/// add or remove owners or to change the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Owner identities, in the order `owners()` reports them.
    pub owners: Vec<Address>,

    /// Minimum distinct owner confirmations before execution.
    pub threshold: u64,
}

impl LedgerConfig {
    /// Create a new config.
    pub fn new(owners: Vec<Address>, threshold: u64) -> Self {
        Self { owners, threshold }
    }

    /// Append an owner.
    pub fn with_owner(mut self, owner: Address) -> Self {
        self.owners.push(owner);
        self
    }

    /// Check the construction rules and build the owner set.
    ///
    /// Requires a non-empty owner list of unique, non-zero identities and
    /// `0 < threshold <= owners.len()`.
    pub fn validate(&self) -> Result<IndexSet<Address>, ConfigError> {
        if self.owners.is_empty() {
            return Err(ConfigError::NoOwners);
        }

        let mut set = IndexSet::with_capacity(self.owners.len());
        for owner in &self.owners {
            if owner.is_zero() {
                return Err(ConfigError::ZeroAddress);
            }
            if !set.insert(*owner) {
                return Err(ConfigError::DuplicateOwner(*owner));
            }
        }

        if self.threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.threshold > set.len() as u64 {
            return Err(ConfigError::ThresholdTooLarge {
                threshold: self.threshold,
                owners: set.len(),
            });
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owners(n: u64) -> Vec<Address> {
        (1..=n).map(Address::from_low_u64).collect()
    }

    #[test]
    fn test_valid_configs() {
        for n in 1..=5 {
            for threshold in 1..=n {
                let set = LedgerConfig::new(owners(n), threshold).validate().unwrap();
                assert_eq!(set.len() as u64, n);
                assert!(set.iter().copied().eq(owners(n)));
            }
        }
    }

    #[test]
    fn test_invalid_configs() {
        assert_eq!(
            LedgerConfig::new(vec![], 1).validate(),
            Err(ConfigError::NoOwners)
        );
        assert_eq!(
            LedgerConfig::new(owners(3), 0).validate(),
            Err(ConfigError::ZeroThreshold)
        );
        assert_eq!(
            LedgerConfig::new(owners(3), 4).validate(),
            Err(ConfigError::ThresholdTooLarge {
                threshold: 4,
                owners: 3
            })
        );

        let dup = Address::from_low_u64(2);
        assert_eq!(
            LedgerConfig::new(owners(3), 2).with_owner(dup).validate(),
            Err(ConfigError::DuplicateOwner(dup))
        );
        assert_eq!(
            LedgerConfig::new(owners(2), 1)
                .with_owner(Address::ZERO)
                .validate(),
            Err(ConfigError::ZeroAddress)
        );
    }

    #[test]
    fn test_deserialize_from_hex_strings() {
        let json = r#"{
            "owners": ["0x0000000000000000000000000000000000000001",
                       "0x0000000000000000000000000000000000000002"],
            "threshold": 2
        }"#;
        let config: LedgerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config, LedgerConfig::new(owners(2), 2));
    }
}
