//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::FieldError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout operation error.
    Checkout(CheckoutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, fields) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Checkout(err) => checkout_error_to_response(err),
        };

        let mut body = serde_json::json!({ "error": message });
        if let Some(fields) = fields {
            body["fields"] = serde_json::json!(fields);
        }
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String, Option<Vec<FieldError>>) {
    match err {
        CheckoutError::Validation(fields) => (
            StatusCode::BAD_REQUEST,
            "Validation failed".to_string(),
            Some(fields),
        ),
        CheckoutError::ProductNotFound(_) | CheckoutError::OrderNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string(), None)
        }
        CheckoutError::InsufficientStock { .. }
        | CheckoutError::InvalidSignature(_)
        | CheckoutError::InvalidWebhookSignature => {
            (StatusCode::BAD_REQUEST, err.to_string(), None)
        }
        CheckoutError::Conflict { .. } | CheckoutError::OutOfStock { .. } => {
            (StatusCode::CONFLICT, err.to_string(), None)
        }
        CheckoutError::Gateway(_) => {
            tracing::error!(error = %err, "payment gateway error");
            (
                StatusCode::BAD_GATEWAY,
                "Payment gateway unavailable".to_string(),
                None,
            )
        }
        CheckoutError::Store(_) | CheckoutError::Domain(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                None,
            )
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
