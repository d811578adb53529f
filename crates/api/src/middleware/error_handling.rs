//! # Error Handling Middleware
//!
//! Converts [`BookingError`] into HTTP responses with a JSON body of the form
//! `{"error": "<message>"}`.
//!
//! | Variant | Status |
//! |---------|--------|
//! | `Validation`, `BusinessRule` | 400 |
//! | `Authorization` | 403 |
//! | `NotFound` | 404 |
//! | `Conflict` | 409 |
//! | `Database`, `Internal` | 500 |
//!
//! Business-rule messages are sent verbatim so clients can match on them.
//! Server-side failures are logged and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use classbook_core::errors::BookingError;
use serde_json::json;
use tracing::error;

/// Wrapper that lets handlers return `Result<T, AppError>` and use `?` on
/// service calls.
#[derive(Debug)]
pub struct AppError(pub BookingError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BookingError::Validation(_) | BookingError::BusinessRule(_) => StatusCode::BAD_REQUEST,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::Authorization(_) => StatusCode::FORBIDDEN,
            BookingError::Database(_) | BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = ?self.0, "request failed");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError(err)
    }
}
