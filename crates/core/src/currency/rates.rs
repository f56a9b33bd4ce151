//! Exchange-rate oracle port and the local rate book.
//!
//! The oracle is polled; nothing is pushed. The book remembers the last quote
//! per display currency for a bounded time and then forgets it, so a stale
//! quote turns into `RateUnavailable` instead of being used silently.

use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use tracing::debug;

use fundrelease_shared::types::Currency;

use super::error::OracleError;
use super::exchange::ExchangeRate;

/// Default time-to-live for a quote (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

/// Display currencies tracked at once.
const MAX_CURRENCIES: u64 = 16;

/// Source of native-to-display exchange rates.
#[async_trait]
pub trait RateOracle: Send + Sync {
    /// Name of the upstream source, used in logs.
    fn source_name(&self) -> &'static str;

    /// Fetches the current price of one native unit in `currency`.
    async fn fetch_rate(&self, currency: Currency) -> Result<ExchangeRate, OracleError>;
}

/// Most recent exchange rate per display currency.
#[derive(Clone)]
pub struct RateBook {
    rates: Cache<Currency, ExchangeRate>,
}

impl RateBook {
    /// Creates a rate book with the default 5 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_TTL_SECS))
    }

    /// Creates a rate book whose quotes expire after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        let rates = Cache::builder()
            .max_capacity(MAX_CURRENCIES)
            .time_to_live(ttl)
            .build();
        Self { rates }
    }

    /// Returns the current quote for `currency`, if one is known and fresh.
    #[must_use]
    pub fn current(&self, currency: Currency) -> Option<ExchangeRate> {
        self.rates.get(&currency)
    }

    /// Stores a quote, replacing any previous one for the same currency.
    pub fn put(&self, rate: ExchangeRate) {
        self.rates.insert(rate.currency, rate);
    }

    /// Drops the quote for `currency`.
    pub fn invalidate(&self, currency: Currency) {
        self.rates.invalidate(&currency);
    }

    /// Fetches a fresh quote from `oracle` and stores it.
    ///
    /// If the oracle is unreachable the previous quote is kept until it
    /// expires. If it answers without a usable rate the previous quote is
    /// dropped.
    pub async fn poll(
        &self,
        oracle: &dyn RateOracle,
        currency: Currency,
    ) -> Result<ExchangeRate, OracleError> {
        let rate = oracle.fetch_rate(currency).await.inspect_err(|e| {
            if !e.is_retryable() {
                self.invalidate(currency);
            }
        })?;
        debug!(
            source = oracle.source_name(),
            currency = %currency,
            rate = %rate.rate,
            "Exchange rate refreshed"
        );
        self.put(rate);
        Ok(rate)
    }
}

impl Default for RateBook {
    fn default() -> Self {
        Self::new()
    }
}
