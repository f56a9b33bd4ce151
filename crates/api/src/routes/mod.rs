//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod campaigns;
pub mod health;
pub mod rates;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(rates::routes())
        .merge(campaigns::routes())
}
