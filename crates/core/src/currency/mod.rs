//! Conversion between the ledger's native unit and a display currency.

pub mod conversion;
pub mod error;
pub mod exchange;
pub mod rates;

#[cfg(test)]
mod props;

pub use conversion::{CurrencyConverter, DISPLAY_DECIMALS, NATIVE_DECIMALS, WithdrawAllQuote};
pub use error::{CurrencyError, OracleError};
pub use exchange::ExchangeRate;
pub use rates::{RateBook, RateOracle};
