//! Error handling module
//!
//! Centralized error types and HTTP response conversion. Every failure
//! renders the standard response envelope; 5xx causes are logged for
//! operators and never echoed to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::api::response::ApiResponse;
use crate::domain::{QuantityError, RatingError};

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Order total mismatch: submitted {submitted}, computed {computed}")]
    TotalMismatch {
        submitted: Decimal,
        computed: Decimal,
    },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Administrator access required")]
    AdminRequired,

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Cart item not found: {0}")]
    CartItemNotFound(Uuid),

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Review not found: {0}")]
    ReviewNotFound(Uuid),

    #[error("You have already reviewed this product")]
    DuplicateReview,

    #[error("Could not allocate a unique order number")]
    OrderNumberExhausted,

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::TotalMismatch { .. } => (StatusCode::BAD_REQUEST, self.to_string()),

            // 401 Unauthorized
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InvalidSession => (StatusCode::UNAUTHORIZED, self.to_string()),

            // 403 Forbidden
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::AdminRequired => (StatusCode::FORBIDDEN, self.to_string()),

            // 404 Not Found
            AppError::ProductNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::CartItemNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::OrderNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::ReviewNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),

            // 409 Conflict
            AppError::DuplicateReview => (StatusCode::CONFLICT, self.to_string()),
            AppError::OrderNumberExhausted => (StatusCode::CONFLICT, self.to_string()),

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::failure(message))).into_response()
    }
}

impl From<QuantityError> for AppError {
    fn from(err: QuantityError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

impl From<RatingError> for AppError {
    fn from(err: RatingError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

/// True when `err` is a unique-constraint violation on the named constraint.
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(constraint),
        _ => false,
    }
}
