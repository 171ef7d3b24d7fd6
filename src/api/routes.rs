//! API Routes
//!
//! HTTP endpoint definitions. Every endpoint, success or failure, answers
//! with the standard `{ success, message, data }` envelope.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::cart::{CartStore, CartView};
use crate::checkout::{
    CheckoutHandler, CreateOrderCommand, CreateOrderResult, OrderItemInput, UpdateStatusResult,
};
use crate::domain::{OrderStatus, Quantity, RatingStats};
use crate::error::AppError;
use crate::review::{
    RatingAggregator, ReviewHandler, ReviewView, SubmitReviewCommand, UpdateReviewCommand,
};

use super::middleware::CurrentUser;
use super::response::{ApiResponse, JsonBody};

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub total_amount: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub rating: i32,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OrderSummaryResponse {
    pub id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: String,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReviewWriteResponse {
    pub review: ReviewView,
    pub stats: RatingStats,
}

#[derive(Debug, Serialize)]
pub struct ProductReviewsResponse {
    pub product_id: Uuid,
    pub stats: RatingStats,
    pub reviews: Vec<ReviewView>,
}

// =========================================================================
// API Routers
// =========================================================================

/// Create the router for session-authenticated routes
pub fn create_router() -> Router<PgPool> {
    Router::new()
        // Cart
        .route("/cart", get(get_cart))
        .route("/cart", delete(clear_cart))
        .route("/cart/items", post(add_cart_item))
        .route("/cart/items/:product_id", patch(update_cart_item))
        .route("/cart/items/:product_id", delete(remove_cart_item))
        // Orders
        .route("/orders", post(create_order))
        .route("/orders", get(list_orders))
        .route("/orders/:order_id", get(get_order))
        // Admin
        .route("/admin/orders/:order_id/status", patch(update_order_status))
        // Reviews
        .route("/products/:product_id/reviews", post(submit_review))
        .route("/reviews/:review_id", patch(update_review))
        .route("/reviews/:review_id", delete(delete_review))
}

/// Create the router for routes served without authentication
pub fn create_public_router() -> Router<PgPool> {
    Router::new().route("/products/:product_id/reviews", get(list_product_reviews))
}

// =========================================================================
// GET /cart
// =========================================================================

/// Get the caller's cart
async fn get_cart(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<CartView>>, AppError> {
    let store = CartStore::new(pool);
    let cart = store.get_cart(current_user.user_id).await?;

    Ok(Json(ApiResponse::ok("Cart retrieved", cart)))
}

// =========================================================================
// POST /cart/items
// =========================================================================

/// Add a product to the caller's cart
async fn add_cart_item(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    JsonBody(request): JsonBody<AddCartItemRequest>,
) -> Result<Json<ApiResponse<CartView>>, AppError> {
    let quantity = Quantity::new(request.quantity)?;

    let store = CartStore::new(pool);
    let cart = store
        .add_item(current_user.user_id, request.product_id, quantity)
        .await?;

    Ok(Json(ApiResponse::ok("Item added to cart", cart)))
}

// =========================================================================
// PATCH /cart/items/:product_id
// =========================================================================

/// Replace the quantity of a cart item
async fn update_cart_item(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
    JsonBody(request): JsonBody<UpdateCartItemRequest>,
) -> Result<Json<ApiResponse<CartView>>, AppError> {
    let quantity = Quantity::new(request.quantity)?;

    let store = CartStore::new(pool);
    let cart = store
        .update_item(current_user.user_id, product_id, quantity)
        .await?;

    Ok(Json(ApiResponse::ok("Cart item updated", cart)))
}

// =========================================================================
// DELETE /cart/items/:product_id
// =========================================================================

/// Remove a product from the caller's cart
async fn remove_cart_item(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CartView>>, AppError> {
    let store = CartStore::new(pool);
    let cart = store.remove_item(current_user.user_id, product_id).await?;

    Ok(Json(ApiResponse::ok("Item removed from cart", cart)))
}

// =========================================================================
// DELETE /cart
// =========================================================================

/// Empty the caller's cart
async fn clear_cart(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let store = CartStore::new(pool);
    store.clear(current_user.user_id).await?;

    Ok(Json(ApiResponse::ok_empty("Cart cleared")))
}

// =========================================================================
// POST /orders
// =========================================================================

/// Place an order
async fn create_order(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    JsonBody(request): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateOrderResult>>), AppError> {
    let items = request
        .items
        .into_iter()
        .map(|item| OrderItemInput::new(item.product_id, item.quantity))
        .collect();
    let command = CreateOrderCommand::new(items, request.total_amount);

    let handler = CheckoutHandler::new(pool);
    let result = handler.create_order(current_user.user_id, command).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Order created", result)),
    ))
}

// =========================================================================
// GET /orders
// =========================================================================

/// List orders. Callers see their own; administrators may pass
/// `?user_id=` to list another user's.
async fn list_orders(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<ApiResponse<Vec<OrderSummaryResponse>>>, AppError> {
    let target_user = query.user_id.unwrap_or(current_user.user_id);
    if !current_user.can_act_for(target_user) {
        return Err(AppError::Forbidden(
            "Only administrators may view other users' orders".to_string(),
        ));
    }

    let rows: Vec<(Uuid, String, Decimal, String, i64, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT o.id, o.order_number, o.total_amount, o.status,
               (SELECT COUNT(*) FROM order_items oi WHERE oi.order_id = o.id) AS item_count,
               o.created_at
        FROM orders o
        WHERE o.user_id = $1
        ORDER BY o.created_at DESC
        "#,
    )
    .bind(target_user)
    .fetch_all(&pool)
    .await?;

    let orders: Vec<OrderSummaryResponse> = rows
        .into_iter()
        .map(
            |(id, order_number, total_amount, status, item_count, created_at)| {
                OrderSummaryResponse {
                    id,
                    order_number,
                    total_amount,
                    status,
                    item_count,
                    created_at,
                }
            },
        )
        .collect();

    Ok(Json(ApiResponse::ok("Orders retrieved", orders)))
}

// =========================================================================
// GET /orders/:order_id
// =========================================================================

/// Get one order with its lines
async fn get_order(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderDetailResponse>>, AppError> {
    let order: Option<(Uuid, Uuid, String, Decimal, String, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT id, user_id, order_number, total_amount, status, created_at
        FROM orders
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&pool)
    .await?;

    let (id, owner_id, order_number, total_amount, status, created_at) =
        order.ok_or(AppError::OrderNotFound(order_id))?;

    if !current_user.can_act_for(owner_id) {
        return Err(AppError::Forbidden(
            "Only the order's owner or an administrator may view it".to_string(),
        ));
    }

    let items: Vec<(Uuid, String, i32, Decimal)> = sqlx::query_as(
        r#"
        SELECT oi.product_id, p.name, oi.quantity, oi.unit_price
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = $1
        ORDER BY p.name
        "#,
    )
    .bind(order_id)
    .fetch_all(&pool)
    .await?;

    let items: Vec<OrderItemResponse> = items
        .into_iter()
        .map(
            |(product_id, product_name, quantity, unit_price)| OrderItemResponse {
                product_id,
                product_name,
                quantity,
                unit_price,
            },
        )
        .collect();

    Ok(Json(ApiResponse::ok(
        "Order retrieved",
        OrderDetailResponse {
            id,
            user_id: owner_id,
            order_number,
            total_amount,
            status,
            items,
            created_at,
        },
    )))
}

// =========================================================================
// PATCH /admin/orders/:order_id/status
// =========================================================================

/// Advance an order's status (admin only)
async fn update_order_status(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(order_id): Path<Uuid>,
    JsonBody(request): JsonBody<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<UpdateStatusResult>>, AppError> {
    if !current_user.is_admin {
        return Err(AppError::AdminRequired);
    }

    let new_status: OrderStatus = request.status.parse().map_err(AppError::InvalidRequest)?;

    let handler = CheckoutHandler::new(pool);
    let result = handler.update_status(order_id, new_status).await?;

    Ok(Json(ApiResponse::ok("Order status updated", result)))
}

// =========================================================================
// POST /products/:product_id/reviews
// =========================================================================

/// Submit a review for a product
async fn submit_review(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
    JsonBody(request): JsonBody<SubmitReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewWriteResponse>>), AppError> {
    let command = SubmitReviewCommand::new(request.rating, request.body);

    let handler = ReviewHandler::new(pool);
    let (review, stats) = handler
        .create(current_user.user_id, product_id, command)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Review submitted",
            ReviewWriteResponse { review, stats },
        )),
    ))
}

// =========================================================================
// PATCH /reviews/:review_id
// =========================================================================

/// Update a review (author or admin)
async fn update_review(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(review_id): Path<Uuid>,
    JsonBody(request): JsonBody<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewWriteResponse>>, AppError> {
    let command = UpdateReviewCommand {
        rating: request.rating,
        body: request.body,
    };

    let handler = ReviewHandler::new(pool);
    let (review, stats) = handler.update(review_id, &current_user, command).await?;

    Ok(Json(ApiResponse::ok(
        "Review updated",
        ReviewWriteResponse { review, stats },
    )))
}

// =========================================================================
// DELETE /reviews/:review_id
// =========================================================================

/// Delete a review (author or admin)
async fn delete_review(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(review_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RatingStats>>, AppError> {
    let handler = ReviewHandler::new(pool);
    let stats = handler.delete(review_id, &current_user).await?;

    Ok(Json(ApiResponse::ok("Review deleted", stats)))
}

// =========================================================================
// GET /products/:product_id/reviews
// =========================================================================

/// List a product's reviews, newest first, with the rating summary
async fn list_product_reviews(
    State(pool): State<PgPool>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductReviewsResponse>>, AppError> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&pool)
        .await?;
    exists.ok_or(AppError::ProductNotFound(product_id))?;

    let rows: Vec<(Uuid, Uuid, Uuid, i32, String, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT id, product_id, user_id, rating, body, created_at, updated_at
        FROM reviews
        WHERE product_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(product_id)
    .fetch_all(&pool)
    .await?;

    let reviews: Vec<ReviewView> = rows
        .into_iter()
        .map(
            |(id, product_id, user_id, rating, body, created_at, updated_at)| ReviewView {
                id,
                product_id,
                user_id,
                rating,
                body,
                created_at,
                updated_at,
            },
        )
        .collect();

    let aggregator = RatingAggregator::new(pool);
    let stats = aggregator.compute_stats(product_id).await?;

    Ok(Json(ApiResponse::ok(
        "Reviews retrieved",
        ProductReviewsResponse {
            product_id,
            stats,
            reviews,
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_cart_item_request_deserialize() {
        let json = r#"{
            "product_id": "550e8400-e29b-41d4-a716-446655440000",
            "quantity": 2
        }"#;

        let request: AddCartItemRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.quantity, 2);
    }

    #[test]
    fn test_create_order_request_deserialize() {
        let json = r#"{
            "items": [
                {"product_id": "550e8400-e29b-41d4-a716-446655440001", "quantity": 2},
                {"product_id": "550e8400-e29b-41d4-a716-446655440002", "quantity": 1}
            ],
            "total_amount": "78.48"
        }"#;

        let request: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.total_amount, "78.48");
    }

    #[test]
    fn test_update_review_request_defaults() {
        let request: UpdateReviewRequest = serde_json::from_str("{}").unwrap();
        assert!(request.rating.is_none());
        assert!(request.body.is_none());
    }

    #[test]
    fn test_submit_review_request_default_body() {
        let request: SubmitReviewRequest = serde_json::from_str(r#"{"rating": 4}"#).unwrap();
        assert_eq!(request.rating, 4);
        assert_eq!(request.body, "");
    }

    #[test]
    fn test_orders_query_defaults() {
        let query: OrdersQuery = serde_json::from_str("{}").unwrap();
        assert!(query.user_id.is_none());
    }
}
