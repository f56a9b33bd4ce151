//! Campaign routes: projection, refresh, evaluation and withdrawals.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use fundrelease_shared::AppError;
use fundrelease_shared::types::{ActorAddress, CampaignAddress, Money};

use crate::{AppState, ApiError};

/// Creates campaign routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/campaigns/{address}", get(get_campaign))
        .route("/campaigns/{address}/refresh", post(refresh_campaign))
        .route("/campaigns/{address}/evaluate", post(evaluate_withdrawal))
        .route("/campaigns/{address}/withdrawals", post(submit_withdrawal))
        .route("/campaigns/{address}/withdraw-all", get(withdraw_all_quote))
}

/// Body of an evaluation request. `amount` is in the display currency and
/// ignored for milestone and all-or-nothing campaigns.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    /// Display-currency amount.
    #[serde(default)]
    pub amount: Decimal,
    /// Milestone to release.
    pub milestone_index: Option<usize>,
}

/// Body of a withdrawal submission.
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// Identity submitting the release.
    pub actor: String,
    /// Display-currency amount.
    #[serde(default)]
    pub amount: Decimal,
    /// Milestone to release.
    pub milestone_index: Option<usize>,
}

fn campaign_address(raw: &str) -> Result<CampaignAddress, ApiError> {
    CampaignAddress::parse(raw).map_err(|e| AppError::Validation(e.to_string()).into())
}

/// GET /campaigns/{address}
async fn get_campaign(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let address = campaign_address(&address)?;
    let projection = state.engine.projection(&address).await?;
    Ok(Json(projection))
}

/// POST /campaigns/{address}/refresh
async fn refresh_campaign(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let address = campaign_address(&address)?;
    let projection = state.engine.refresh(&address).await?;
    Ok(Json(projection))
}

/// POST /campaigns/{address}/evaluate
async fn evaluate_withdrawal(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(body): Json<EvaluateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let address = campaign_address(&address)?;
    let evaluation = state
        .engine
        .evaluate(&address, body.amount, body.milestone_index)
        .await?;
    Ok(Json(evaluation))
}

/// POST /campaigns/{address}/withdrawals
async fn submit_withdrawal(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(body): Json<WithdrawRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let address = campaign_address(&address)?;
    let actor = ActorAddress::parse(&body.actor).map_err(|e| AppError::Validation(e.to_string()))?;
    let requested = Money::new(body.amount, state.engine.display_currency());

    let confirmation = state
        .engine
        .submit(&address, &actor, body.amount, body.milestone_index)
        .await?;

    info!(
        campaign = %address,
        requested = %requested,
        tx_hash = %confirmation.tx_hash,
        released = %confirmation.released_amount,
        "Withdrawal confirmed via API"
    );

    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// GET /campaigns/{address}/withdraw-all
async fn withdraw_all_quote(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let address = campaign_address(&address)?;
    let quote = state.engine.quote_withdraw_all(&address).await?;
    Ok(Json(quote))
}
