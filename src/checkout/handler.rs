//! Checkout handler
//!
//! Order placement is the single authority over stock. Each line is
//! decremented with a conditional UPDATE inside one transaction, so an
//! order either commits with every decrement applied or rolls back
//! leaving stock untouched. Totals are recomputed from current prices
//! and verified against the client's figure before anything persists.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{OrderNumber, OrderStatus, Quantity};
use crate::error::{is_unique_violation, AppError};

use super::commands::{CreateOrderCommand, CreateOrderResult, OrderItemInput, UpdateStatusResult};

/// Unique constraint backing order number allocation
const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

/// Handler for order placement and status transitions
#[derive(Debug, Clone)]
pub struct CheckoutHandler {
    pool: PgPool,
}

impl CheckoutHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // create_order with retry
    // =========================================================================

    /// Place an order, retrying on order number collisions
    pub async fn create_order(
        &self,
        user_id: Uuid,
        command: CreateOrderCommand,
    ) -> Result<CreateOrderResult, AppError> {
        const MAX_RETRIES: u32 = 3;

        if command.items.is_empty() {
            return Err(AppError::InvalidRequest(
                "Order must contain at least one item".to_string(),
            ));
        }
        for item in &command.items {
            Quantity::new(item.quantity)?;
        }
        let submitted_total: Decimal = command.total_amount.parse().map_err(|_| {
            AppError::InvalidRequest(format!(
                "total_amount is not a valid decimal amount: {}",
                command.total_amount
            ))
        })?;

        // Lock products in a stable order so concurrent orders cannot deadlock
        let mut items = command.items.clone();
        items.sort_by_key(|item| item.product_id);

        for attempt in 0..MAX_RETRIES {
            match self
                .try_create_order(user_id, &items, submitted_total)
                .await
            {
                Ok(result) => return Ok(result),
                Err(AppError::OrderNumberExhausted) if attempt < MAX_RETRIES - 1 => {
                    // Backoff before regenerating the number
                    let delay = Duration::from_millis(50 * (attempt as u64 + 1));
                    tokio::time::sleep(delay).await;
                    tracing::warn!(
                        "Order number collision, retrying (attempt {}/{})",
                        attempt + 1,
                        MAX_RETRIES
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::OrderNumberExhausted)
    }

    // =========================================================================
    // try_create_order (single attempt)
    // =========================================================================

    /// Try to place an order (single attempt)
    async fn try_create_order(
        &self,
        user_id: Uuid,
        items: &[OrderItemInput],
        submitted_total: Decimal,
    ) -> Result<CreateOrderResult, AppError> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement per line; a None row means the guard failed
        let mut priced_items: Vec<(Uuid, i32, Decimal)> = Vec::with_capacity(items.len());
        for item in items {
            let decremented: Option<(Decimal,)> = sqlx::query_as(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - $2, updated_at = NOW()
                WHERE id = $1 AND stock_quantity >= $2
                RETURNING price
                "#,
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .fetch_optional(&mut *tx)
            .await?;

            match decremented {
                Some((unit_price,)) => {
                    priced_items.push((item.product_id, item.quantity, unit_price));
                }
                None => {
                    // Distinguish a missing product from thin stock
                    let available: Option<(i32,)> =
                        sqlx::query_as("SELECT stock_quantity FROM products WHERE id = $1")
                            .bind(item.product_id)
                            .fetch_optional(&mut *tx)
                            .await?;

                    return Err(match available {
                        Some((stock,)) => AppError::InsufficientStock {
                            product_id: item.product_id,
                            requested: item.quantity,
                            available: stock,
                        },
                        None => AppError::ProductNotFound(item.product_id),
                    });
                }
            }
        }

        let computed_total = compute_total(&priced_items);
        if computed_total != submitted_total {
            return Err(AppError::TotalMismatch {
                submitted: submitted_total,
                computed: computed_total,
            });
        }

        let order_id = Uuid::new_v4();
        let order_number = OrderNumber::generate(Utc::now());

        let (created_at,): (DateTime<Utc>,) = sqlx::query_as(
            r#"
            INSERT INTO orders (id, user_id, order_number, total_amount, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .bind(order_number.as_str())
        .bind(computed_total)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, ORDER_NUMBER_CONSTRAINT) {
                AppError::OrderNumberExhausted
            } else {
                AppError::Database(e)
            }
        })?;

        for (product_id, quantity, unit_price) in &priced_items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(product_id)
            .bind(quantity)
            .bind(unit_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Order {} ({}) created for user {}: {} lines, total {}",
            order_id,
            order_number,
            user_id,
            priced_items.len(),
            computed_total
        );

        Ok(CreateOrderResult {
            order_id,
            order_number: order_number.into_string(),
            total_amount: computed_total,
            status: OrderStatus::Pending,
            created_at,
        })
    }

    // =========================================================================
    // update_status
    // =========================================================================

    /// Advance an order through its status lifecycle. The current status
    /// row is locked so concurrent transitions serialize, and the move is
    /// validated against the allowed transitions before the write.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<UpdateStatusResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String, String)> =
            sqlx::query_as("SELECT order_number, status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;

        let (order_number, current_raw) = row.ok_or(AppError::OrderNotFound(order_id))?;
        let current: OrderStatus = current_raw.parse().map_err(AppError::Internal)?;

        if !current.can_transition_to(new_status) {
            return Err(AppError::InvalidRequest(format!(
                "Cannot transition order from {} to {}",
                current, new_status
            )));
        }

        let (updated_at,): (DateTime<Utc>,) = sqlx::query_as(
            r#"
            UPDATE orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING updated_at
            "#,
        )
        .bind(order_id)
        .bind(new_status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Order {} transitioned {} -> {}",
            order_id,
            current,
            new_status
        );

        Ok(UpdateStatusResult {
            order_id,
            order_number,
            status: new_status,
            updated_at,
        })
    }
}

/// Sum of unit price times quantity across all lines
fn compute_total(items: &[(Uuid, i32, Decimal)]) -> Decimal {
    items
        .iter()
        .map(|(_, quantity, unit_price)| *unit_price * Decimal::from(*quantity))
        .sum()
}
