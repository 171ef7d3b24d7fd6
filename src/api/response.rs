//! Response envelope
//!
//! Every operation answers with the same JSON shape, success and failure
//! alike: `{ "success": bool, "message": string, "data": object|null }`.
//! A 2xx response never carries `success: false`.

use axum::extract::{FromRequest, Request};
use axum::{async_trait, Json};
use serde::Serialize;

use crate::error::AppError;

/// Standard response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope carrying a payload
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Successful envelope with no payload (`data: null`)
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// Failure envelope (`data: null`)
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// JSON body extractor that reports malformed bodies through the standard
/// envelope instead of axum's plain-text rejection.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::InvalidRequest(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_envelope_shape() {
        let response = ApiResponse::ok("Cart retrieved", json!({ "total_items": 2 }));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Cart retrieved");
        assert_eq!(value["data"]["total_items"], 2);
        assert_eq!(value.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_ok_empty_has_null_data() {
        let response = ApiResponse::ok_empty("Cart cleared");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], true);
        assert!(value["data"].is_null());
    }

    #[test]
    fn test_failure_envelope() {
        let response = ApiResponse::failure("Product not found");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Product not found");
        assert!(value["data"].is_null());
    }
}
