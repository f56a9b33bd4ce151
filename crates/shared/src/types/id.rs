//! Typed ledger addresses for type-safe references.
//!
//! Using typed addresses prevents accidentally passing an `ActorAddress` where a
//! `CampaignAddress` is expected. Addresses are stored lowercased so that two
//! spellings of the same key compare equal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of hex digits in a ledger address (20 bytes).
const ADDRESS_HEX_LEN: usize = 40;

/// Error returned when parsing a malformed address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ledger address: {0}")]
pub struct AddressError(pub String);

/// Macro to generate typed address wrappers.
macro_rules! typed_address {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parses and normalizes an address (`0x` followed by 40 hex digits).
            pub fn parse(raw: &str) -> Result<Self, AddressError> {
                let trimmed = raw.trim();
                let hex = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .ok_or_else(|| AddressError(raw.to_string()))?;
                if hex.len() != ADDRESS_HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(AddressError(raw.to_string()));
                }
                Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
            }

            /// Returns the normalized address string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = AddressError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = AddressError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

typed_address!(CampaignAddress, "Ledger address of a campaign pool.");
typed_address!(
    ActorAddress,
    "Ledger address of the identity acting on a campaign."
);
