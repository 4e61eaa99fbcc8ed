//! Custom error types for the booking service
//!
//! One taxonomy covers every operation: precondition violations map to the
//! 4xx family, store and collaborator failures surface as 500 after the
//! operation's unit of work has been rolled back. Every failure body is
//! `{"message": ...}` with a stable, human-readable message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Custom error type for the booking service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or missing parameters, user-correctable
    #[error("{0}")]
    InvalidInput(String),

    /// No verified caller identity
    #[error("Unauthorized access")]
    Unauthorized,

    /// The resource exists but does not belong to the caller
    #[error("{0}")]
    Forbidden(String),

    /// Referenced room, booking or user is absent
    #[error("{0}")]
    NotFound(String),

    /// The operation clashes with current state (stock exhausted, duplicate email)
    #[error("{0}")]
    Conflict(String),

    /// The booking has already been paid
    #[error("Booking is already paid")]
    AlreadyPaid,

    /// The caller's balance does not cover the booking price
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Store or downstream collaborator failure
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::AlreadyPaid | ApiError::InsufficientBalance => {
                StatusCode::CONFLICT
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let ApiError::Internal(source) = &self {
            tracing::error!("Internal error: {:#}", source);
        }

        let body = Json(json!({
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Type alias for service results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(ApiError::AlreadyPaid.to_string(), "Booking is already paid");
        assert_eq!(
            ApiError::InsufficientBalance.to_string(),
            "Insufficient balance"
        );
        assert_eq!(
            ApiError::NotFound("Booking not found".to_string()).to_string(),
            "Booking not found"
        );
    }
}
