//! Checkout command definitions
//!
//! Commands represent intentions to place or advance an order; results
//! carry the committed outcome back to the API layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::OrderStatus;

// =========================================================================
// CreateOrderCommand
// =========================================================================

/// One requested order line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl OrderItemInput {
    pub fn new(product_id: Uuid, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Command to place an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderCommand {
    pub items: Vec<OrderItemInput>,
    /// Client-computed grand total as a decimal string, e.g. "59.98".
    /// Verified against the server-side recomputation before anything
    /// is written.
    pub total_amount: String,
}

impl CreateOrderCommand {
    pub fn new(items: Vec<OrderItemInput>, total_amount: String) -> Self {
        Self {
            items,
            total_amount,
        }
    }
}

/// Outcome of a committed order
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResult {
    pub order_id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

// =========================================================================
// UpdateStatusResult
// =========================================================================

/// Outcome of an order status transition
#[derive(Debug, Clone, Serialize)]
pub struct UpdateStatusResult {
    pub order_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}
