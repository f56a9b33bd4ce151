//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::error;

use fundrelease_core::coordinator::TxError;
use fundrelease_core::currency::CurrencyError;
use fundrelease_shared::AppError;

/// Error returned by handlers, rendered as `{ "error": code, "message": text, ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    extra: Option<Value>,
}

impl ApiError {
    /// Returns the HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self {
            status: status_from(err.status_code()),
            code: err.error_code(),
            message: err.to_string(),
            extra: None,
        }
    }
}

impl From<CurrencyError> for ApiError {
    fn from(err: CurrencyError) -> Self {
        Self {
            status: status_from(err.http_status_code()),
            code: err.error_code(),
            message: err.to_string(),
            extra: None,
        }
    }
}

impl From<TxError> for ApiError {
    fn from(err: TxError) -> Self {
        let mut extra = json!({
            "category": err.category(),
            "retryable": err.is_retryable(),
            "requires_refresh": err.requires_refresh(),
        });
        if let TxError::Policy(reason) = &err {
            extra["reason"] = json!(reason);
        }
        Self {
            status: status_from(err.http_status_code()),
            code: err.error_code(),
            message: err.to_string(),
            extra: Some(extra),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "Request failed");
        }

        let mut body = json!({
            "error": self.code,
            "message": self.message,
        });
        if let (Some(Value::Object(extra)), Some(map)) = (self.extra, body.as_object_mut()) {
            map.extend(extra);
        }
        (self.status, Json(body)).into_response()
    }
}
