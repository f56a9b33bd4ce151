//! Exchange rate between the ledger's native unit and a display currency.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fundrelease_shared::types::Currency;

use super::error::CurrencyError;

/// Quote of one native unit in a display currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Display currency the rate is quoted in.
    pub currency: Currency,
    /// Display units per one native unit (1 native = rate display).
    pub rate: Decimal,
    /// When the oracle produced this quote.
    pub observed_at: DateTime<Utc>,
}

impl ExchangeRate {
    /// Creates a new exchange rate.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::InvalidRate` unless `rate > 0`.
    pub fn new(
        currency: Currency,
        rate: Decimal,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, CurrencyError> {
        if rate <= Decimal::ZERO {
            return Err(CurrencyError::InvalidRate(rate));
        }
        Ok(Self {
            currency,
            rate,
            observed_at,
        })
    }
}
