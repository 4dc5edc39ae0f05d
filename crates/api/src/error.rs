//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use storage::StorageError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout workflow error.
    Checkout(CheckoutError),
    /// Storage layer error.
    Storage(StorageError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Storage(err) => storage_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CheckoutError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CheckoutError::InsufficientStock { .. } | CheckoutError::Conflict(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        CheckoutError::GenerationExhausted | CheckoutError::PersistenceFailure(_) => {
            tracing::error!(error = %err, "checkout failed fatally");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn storage_error_to_response(err: StorageError) -> (StatusCode, String) {
    match &err {
        StorageError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StorageError::DuplicateAccount(_) | StorageError::DuplicateOrderNo(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        StorageError::InsufficientStock { .. } | StorageError::StockConflict(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        StorageError::Database(_) | StorageError::Migration(_) => {
            tracing::error!(error = %err, "storage failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err)
    }
}
