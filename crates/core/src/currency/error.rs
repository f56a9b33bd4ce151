//! Currency conversion and exchange-rate errors.

use rust_decimal::Decimal;
use thiserror::Error;

use fundrelease_shared::types::Currency;

/// Errors raised while converting between native and display amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyError {
    /// No exchange rate has been supplied yet (or the last one expired).
    #[error("Exchange rate is not available")]
    RateUnavailable,

    /// Exchange rate must be positive.
    #[error("Exchange rate must be positive, got {0}")]
    InvalidRate(Decimal),

    /// Amount must not be negative.
    #[error("Amount must not be negative, got {0}")]
    InvalidAmount(Decimal),

    /// Conversion result does not fit in a decimal.
    #[error("Conversion overflowed")]
    Overflow,
}

impl CurrencyError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::RateUnavailable => "RATE_UNAVAILABLE",
            Self::InvalidRate(_) => "INVALID_RATE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::Overflow => "CONVERSION_OVERFLOW",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::RateUnavailable => 503,
            Self::InvalidRate(_) | Self::InvalidAmount(_) | Self::Overflow => 400,
        }
    }

    /// Returns true if retrying later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateUnavailable)
    }
}

/// Errors raised by an exchange-rate oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The oracle could not be reached or answered with a failure status.
    #[error("Exchange-rate oracle unreachable: {0}")]
    Unreachable(String),

    /// The oracle answered but did not quote the requested currency.
    #[error("Exchange-rate oracle has no rate for {0}")]
    RateMissing(Currency),

    /// The oracle quoted a rate that is not a positive decimal.
    #[error("Exchange-rate oracle returned an invalid rate: {0}")]
    InvalidRate(String),
}

impl OracleError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "ORACLE_UNREACHABLE",
            Self::RateMissing(_) => "ORACLE_RATE_MISSING",
            Self::InvalidRate(_) => "ORACLE_INVALID_RATE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Unreachable(_) => 503,
            Self::RateMissing(_) | Self::InvalidRate(_) => 502,
        }
    }

    /// Returns true if polling again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}
