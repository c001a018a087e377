//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use cart::CartError;
use catalog::CatalogError;
use checkout::CheckoutError;

use crate::auth::AuthError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Catalog layer error.
    Catalog(CatalogError),
    /// Cart layer error.
    Cart(CartError),
    /// Checkout layer error.
    Checkout(CheckoutError),
    /// Registration or login error.
    Auth(AuthError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Validation failures carry the full violation list so the client
        // can fix the whole cart in one pass.
        if let ApiError::Checkout(CheckoutError::ValidationFailed(violations)) = &self {
            let body = serde_json::json!({
                "error": self.to_string(),
                "violations": violations,
            });
            return (StatusCode::CONFLICT, axum::Json(body)).into_response();
        }

        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Catalog(err) => catalog_error_to_response(err),
            ApiError::Cart(err) => cart_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Auth(err) => auth_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Internal(msg) => write!(f, "{msg}"),
            ApiError::Catalog(err) => write!(f, "{err}"),
            ApiError::Cart(err) => write!(f, "{err}"),
            ApiError::Checkout(err) => write!(f, "{err}"),
            ApiError::Auth(err) => write!(f, "{err}"),
        }
    }
}

fn catalog_error_to_response(err: CatalogError) -> (StatusCode, String) {
    match &err {
        CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CatalogError::InsufficientStock { .. } => (StatusCode::CONFLICT, err.to_string()),
        CatalogError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn cart_error_to_response(err: CartError) -> (StatusCode, String) {
    match err {
        CartError::InvalidQuantity { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        CartError::ItemNotInCart { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        // Retryable: the cart is still at its last valid state.
        CartError::Persistence(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        CartError::Catalog(inner) => catalog_error_to_response(inner),
        CartError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match err {
        CheckoutError::EmptyCart => (StatusCode::BAD_REQUEST, err.to_string()),
        CheckoutError::ValidationFailed(_)
        | CheckoutError::Conflict { .. }
        | CheckoutError::InvalidState { .. } => (StatusCode::CONFLICT, err.to_string()),
        CheckoutError::Catalog(inner) => catalog_error_to_response(inner),
        CheckoutError::Cart(inner) => cart_error_to_response(inner),
        // Retryable: the commit was rolled back.
        CheckoutError::OrderStore(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
    }
}

fn auth_error_to_response(err: AuthError) -> (StatusCode, String) {
    match &err {
        AuthError::EmailTaken(_) => (StatusCode::CONFLICT, err.to_string()),
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, err.to_string()),
        AuthError::Hashing(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        ApiError::Cart(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}
