//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`,
//! rendered as `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::epcc::EpccError;
use crate::session::SessionError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A shopper session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Browser session storage failed.
    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Session(err) => match err {
                SessionError::NoCart | SessionError::NoCartToCheckout => StatusCode::NOT_FOUND,
                SessionError::InvalidCheckout(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SessionError::CheckoutComplete | SessionError::CheckoutInProgress => {
                    StatusCode::CONFLICT
                }
                SessionError::OrderCreationFailed | SessionError::PaymentFailed { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                SessionError::Epcc(e) => epcc_status(e),
                SessionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the shopper.
    fn public_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::Session(SessionError::Storage(_)) => {
                "Internal server error".to_string()
            }
            Self::Session(SessionError::Epcc(EpccError::Config(_))) => {
                "Storefront is not configured".to_string()
            }
            Self::Session(err) => err.to_string(),
            Self::BadRequest(_) => self.to_string(),
        }
    }
}

fn epcc_status(err: &EpccError) -> StatusCode {
    match err {
        EpccError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        EpccError::Api { status: 404, .. } => StatusCode::NOT_FOUND,
        EpccError::Api { status, .. } if (400..500).contains(status) => StatusCode::BAD_REQUEST,
        EpccError::Auth(_) => StatusCode::UNAUTHORIZED,
        EpccError::Config(_) | EpccError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EpccError::Http(_) | EpccError::Api { .. } | EpccError::Parse(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
