//! Coinbase exchange-rate oracle.
//!
//! `GET {base}/v2/exchange-rates?currency={native}` answers with every quote
//! for one native unit:
//!
//! ```json
//! { "data": { "currency": "ETH", "rates": { "MYR": "14012.55", "USD": "3120.4" } } }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use fundrelease_core::currency::{ExchangeRate, OracleError, RateOracle};
use fundrelease_shared::types::Currency;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Rate oracle backed by the Coinbase exchange-rates endpoint.
#[derive(Debug, Clone)]
pub struct CoinbaseOracle {
    http: reqwest::Client,
    base_url: String,
    native_symbol: String,
}

impl CoinbaseOracle {
    /// Creates an oracle quoting `native_symbol` at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, native_symbol: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            native_symbol: native_symbol.into(),
        }
    }

    fn exchange_rates_url(&self) -> String {
        format!("{}/v2/exchange-rates", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RateOracle for CoinbaseOracle {
    fn source_name(&self) -> &'static str {
        "coinbase"
    }

    async fn fetch_rate(&self, currency: Currency) -> Result<ExchangeRate, OracleError> {
        let resp = self
            .http
            .get(self.exchange_rates_url())
            .query(&[("currency", self.native_symbol.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| OracleError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OracleError::Unreachable(format!(
                "coinbase http error status={}",
                status.as_u16()
            )));
        }

        let body: ExchangeRatesResponse = resp
            .json()
            .await
            .map_err(|e| OracleError::Unreachable(format!("coinbase response decode failed: {e}")))?;

        let raw = body
            .data
            .rates
            .get(currency.code())
            .ok_or(OracleError::RateMissing(currency))?;
        let rate: Decimal = raw
            .parse()
            .map_err(|_| OracleError::InvalidRate(raw.clone()))?;

        debug!(
            native = %self.native_symbol,
            currency = %currency,
            rate = %rate,
            "Coinbase quote received"
        );

        ExchangeRate::new(currency, rate, Utc::now())
            .map_err(|_| OracleError::InvalidRate(raw.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeRatesResponse {
    data: ExchangeRatesData,
}

#[derive(Debug, Deserialize)]
struct ExchangeRatesData {
    #[serde(default)]
    rates: HashMap<String, String>,
}
