//! Currency conversion logic.
//!
//! CRITICAL: Rounding strategy between native and display amounts:
//! - Anything that bounds what may be requested from the ledger is truncated
//!   toward zero at 6 native fractional digits, so rounding can never push a
//!   request above the real balance
//! - Display-only values use 2 fractional digits with standard rounding
//!   (half away from zero)

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::error::CurrencyError;
use super::exchange::ExchangeRate;

/// Fractional digits kept on native amounts handed to the ledger.
pub const NATIVE_DECIMALS: u32 = 6;

/// Fractional digits shown for display-currency amounts.
pub const DISPLAY_DECIMALS: u32 = 2;

/// Maximum amount for a "withdraw all" action, in both units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawAllQuote {
    /// Native amount, truncated to `NATIVE_DECIMALS`.
    pub native: Decimal,
    /// Display amount, truncated to `DISPLAY_DECIMALS`.
    pub display: Decimal,
}

/// Converter between native ledger units and a display currency.
pub struct CurrencyConverter;

impl CurrencyConverter {
    /// Converts a display amount into native units.
    ///
    /// The result is truncated toward zero at 6 fractional digits, so
    /// `to_native(x) * rate <= x` always holds.
    ///
    /// # Errors
    ///
    /// - `RateUnavailable` if `rate` is `None`
    /// - `InvalidRate` if the rate is not positive
    /// - `InvalidAmount` if `display_amount` is negative
    pub fn to_native(
        display_amount: Decimal,
        rate: Option<&ExchangeRate>,
    ) -> Result<Decimal, CurrencyError> {
        let rate = Self::usable_rate(rate)?;
        if display_amount < Decimal::ZERO {
            return Err(CurrencyError::InvalidAmount(display_amount));
        }
        let native = display_amount
            .checked_div(rate)
            .ok_or(CurrencyError::Overflow)?;
        Ok(Self::floor_native(native))
    }

    /// Converts a native amount into the display currency for presentation.
    ///
    /// # Errors
    ///
    /// Same as [`CurrencyConverter::to_native`].
    pub fn to_display(
        native_amount: Decimal,
        rate: Option<&ExchangeRate>,
    ) -> Result<Decimal, CurrencyError> {
        let rate = Self::usable_rate(rate)?;
        if native_amount < Decimal::ZERO {
            return Err(CurrencyError::InvalidAmount(native_amount));
        }
        let display = native_amount
            .checked_mul(rate)
            .ok_or(CurrencyError::Overflow)?;
        Ok(display.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Truncates a native amount toward zero at 6 fractional digits.
    #[must_use]
    pub fn floor_native(amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(NATIVE_DECIMALS, RoundingStrategy::ToZero)
    }

    /// Truncates a display amount toward zero at 2 fractional digits.
    #[must_use]
    pub fn floor_display(amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::ToZero)
    }

    /// Builds the "withdraw all" quote for a native ceiling.
    ///
    /// Both sides are truncated, so converting `display` back with
    /// [`CurrencyConverter::to_native`] never exceeds `native`.
    ///
    /// # Errors
    ///
    /// Same as [`CurrencyConverter::to_native`].
    pub fn withdraw_all(
        max_native: Decimal,
        rate: Option<&ExchangeRate>,
    ) -> Result<WithdrawAllQuote, CurrencyError> {
        let rate = Self::usable_rate(rate)?;
        if max_native < Decimal::ZERO {
            return Err(CurrencyError::InvalidAmount(max_native));
        }
        let native = Self::floor_native(max_native);
        let display = native.checked_mul(rate).ok_or(CurrencyError::Overflow)?;
        Ok(WithdrawAllQuote {
            native,
            display: Self::floor_display(display),
        })
    }

    fn usable_rate(rate: Option<&ExchangeRate>) -> Result<Decimal, CurrencyError> {
        let rate = rate.ok_or(CurrencyError::RateUnavailable)?;
        if rate.rate <= Decimal::ZERO {
            return Err(CurrencyError::InvalidRate(rate.rate));
        }
        Ok(rate.rate)
    }
}
