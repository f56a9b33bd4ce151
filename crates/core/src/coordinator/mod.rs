//! Withdrawal submission and confirmation handling.

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{TxError, TxErrorCategory};
pub use service::{DEFAULT_CONFIRMATION_TIMEOUT, TransactionCoordinator};
pub use types::Confirmation;
