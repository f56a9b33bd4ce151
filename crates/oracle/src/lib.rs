//! Exchange-rate oracle clients.
//!
//! Implementations of [`fundrelease_core::currency::RateOracle`] over HTTP.

pub mod coinbase;

pub use coinbase::CoinbaseOracle;
