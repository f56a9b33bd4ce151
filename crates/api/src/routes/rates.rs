//! Exchange-rate endpoint.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use fundrelease_core::currency::CurrencyError;
use fundrelease_shared::types::Currency;

use crate::{AppState, ApiError};

/// Current display-currency quote.
#[derive(Debug, Serialize)]
pub struct RateResponse {
    /// Display currency.
    pub currency: Currency,
    /// Display units per native unit.
    pub rate: Decimal,
    /// When the oracle observed the rate.
    pub observed_at: DateTime<Utc>,
}

/// Creates rate routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/rates", get(current_rate))
}

/// GET /rates
async fn current_rate(State(state): State<AppState>) -> Result<Json<RateResponse>, ApiError> {
    let rate = state.engine.rate().ok_or(CurrencyError::RateUnavailable)?;
    Ok(Json(RateResponse {
        currency: rate.currency,
        rate: rate.rate,
        observed_at: rate.observed_at,
    }))
}
