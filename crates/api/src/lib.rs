//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for campaign projections, evaluation and withdrawals
//! - Exchange-rate lookup
//! - JSON error responses

pub mod error;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use fundrelease_core::WithdrawalEngine;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Withdrawal engine over the campaign ledger.
    pub engine: Arc<WithdrawalEngine>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
