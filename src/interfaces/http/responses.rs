use crate::error::PaymentError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<Decimal>,
}

impl PaymentError {
    /// HTTP status for each error class.
    ///
    /// Gateway and storage failures are the retryable ones: 502 tells the
    /// client to retry against the gateway, 5xx on the webhook path makes
    /// the gateway redeliver. Terminal token states are 403; the caller
    /// needs a fresh reconciliation, not a retry.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TokenExpired | Self::TokenAlreadyUsed => StatusCode::FORBIDDEN,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (required, available) = match &self {
            Self::InsufficientBalance {
                required,
                available,
            } => (Some(*required), Some(*available)),
            _ => (None, None),
        };
        let body = ErrorBody {
            error: self.to_string(),
            required,
            available,
        };
        (status, Json(body)).into_response()
    }
}
