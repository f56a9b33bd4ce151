//! Display-currency money type.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.
//! Native ledger quantities are plain `Decimal`s; `Money` is only used for the
//! human-facing side of a conversion.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents a display amount with currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in display units (e.g., ringgit, not sen).
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., "MYR", "USD").
    pub currency: Currency,
}

/// ISO 4217 display currencies supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Malaysian Ringgit
    Myr,
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Singapore Dollar
    Sgd,
    /// Indonesian Rupiah
    Idr,
}

impl Currency {
    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Myr => "MYR",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Sgd => "SGD",
            Self::Idr => "IDR",
        }
    }
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.currency, self.amount)
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MYR" => Ok(Self::Myr),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "SGD" => Ok(Self::Sgd),
            "IDR" => Ok(Self::Idr),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
