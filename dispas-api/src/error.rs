//! API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use dispas_core::error::DispasError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
        }
    }

    /// Bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
    }

    /// Internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR")
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    pub fn code(&self) -> &str {
        &self.code
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

/// Maps protocol errors to a status, keeping the stable code.
impl From<DispasError> for ApiError {
    fn from(err: DispasError) -> Self {
        let status = match &err {
            DispasError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            DispasError::RecipientNotRegistered(_) | DispasError::AnnouncementNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            DispasError::InsufficientBalance { .. } | DispasError::TransferRejected { .. } => {
                StatusCode::CONFLICT
            }
            DispasError::LedgerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DispasError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            DispasError::UnsupportedScheme(_) => StatusCode::UNPROCESSABLE_ENTITY,
            e if e.is_validation_error() || e.is_crypto_error() => StatusCode::UNPROCESSABLE_ENTITY,
            DispasError::BareDepositRejected
            | DispasError::HexError(_)
            | DispasError::JsonError(_) => StatusCode::BAD_REQUEST,
            _ => {
                tracing::error!(error = %err, "Internal error");
                return ApiError::internal("An internal error occurred");
            }
        };

        ApiError::new(status, err.to_string(), err.code())
    }
}

impl From<hex::FromHexError> for ApiError {
    fn from(err: hex::FromHexError) -> Self {
        ApiError::bad_request(format!("Invalid hex: {}", err))
    }
}
