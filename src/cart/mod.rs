//! Cart module
//!
//! Per-user shopping carts with stock-aware reads. Carts are keyed by
//! user id, created lazily on first access, and never deleted (only
//! emptied). Reads clamp displayed quantities to current stock without
//! correcting the stored rows.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Quantity;
use crate::error::AppError;

/// One cart line as returned to clients. `quantity` is the effective
/// (stock-clamped) quantity, not necessarily the stored one.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub stock_quantity: i32,
    pub line_total: Decimal,
}

/// Cart contents with totals priced at current product prices
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total_items: i64,
    pub total_price: Decimal,
}

impl CartView {
    /// Build the view from joined `(product_id, name, price,
    /// stored_quantity, stock_quantity)` rows.
    fn from_rows(rows: Vec<(Uuid, String, Decimal, i32, i32)>) -> Self {
        let items: Vec<CartItemView> = rows
            .into_iter()
            .map(|(product_id, name, unit_price, stored, stock)| {
                let quantity = effective_quantity(stored, stock);
                CartItemView {
                    product_id,
                    name,
                    unit_price,
                    quantity,
                    stock_quantity: stock,
                    line_total: unit_price * Decimal::from(quantity),
                }
            })
            .collect();

        let total_items = items.iter().map(|item| item.quantity as i64).sum();
        let total_price = items.iter().map(|item| item.line_total).sum();

        Self {
            items,
            total_items,
            total_price,
        }
    }
}

/// Displayed quantity: the stored quantity clamped to current stock,
/// never below zero. Reads never correct the stored row.
fn effective_quantity(stored: i32, stock: i32) -> i32 {
    stored.min(stock).max(0)
}

/// Store for per-user carts
#[derive(Debug, Clone)]
pub struct CartStore {
    pool: PgPool,
}

impl CartStore {
    /// Create a new CartStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // get_cart
    // =========================================================================

    /// Fetch the user's cart, creating it lazily on first access.
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, AppError> {
        let cart_id = self.ensure_cart(user_id).await?;
        self.view(cart_id).await
    }

    // =========================================================================
    // add_item
    // =========================================================================

    /// Add `quantity` of a product to the user's cart. The stock gate is
    /// cumulative: stored quantity plus increment must not exceed the
    /// product's current stock.
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: Quantity,
    ) -> Result<CartView, AppError> {
        let stock = self.product_stock(product_id).await?;
        let cart_id = self.ensure_cart(user_id).await?;

        let stored: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM cart_items WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        let new_quantity = stored.unwrap_or(0) + quantity.value();
        if new_quantity > stock {
            return Err(AppError::InsufficientStock {
                product_id,
                requested: new_quantity,
                available: stock,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cart_id)
        .bind(product_id)
        .bind(new_quantity)
        .execute(&self.pool)
        .await?;

        self.view(cart_id).await
    }

    // =========================================================================
    // update_item
    // =========================================================================

    /// Replace the stored quantity of a cart item. The target quantity is
    /// checked against current stock. Removal is a distinct operation, so
    /// non-positive quantities never reach this method (`Quantity`).
    pub async fn update_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: Quantity,
    ) -> Result<CartView, AppError> {
        let stock = self.product_stock(product_id).await?;
        if quantity.value() > stock {
            return Err(AppError::InsufficientStock {
                product_id,
                requested: quantity.value(),
                available: stock,
            });
        }

        let cart_id = match self.find_cart(user_id).await? {
            Some(cart_id) => cart_id,
            None => return Err(AppError::CartItemNotFound(product_id)),
        };

        let rows_affected = sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = $3, updated_at = NOW()
            WHERE cart_id = $1 AND product_id = $2
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity.value())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::CartItemNotFound(product_id));
        }

        self.view(cart_id).await
    }

    // =========================================================================
    // remove_item
    // =========================================================================

    /// Remove a product from the user's cart. An absent item is NotFound;
    /// callers may treat that as non-fatal.
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, AppError> {
        let cart_id = match self.find_cart(user_id).await? {
            Some(cart_id) => cart_id,
            None => return Err(AppError::CartItemNotFound(product_id)),
        };

        let rows_affected =
            sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
                .bind(cart_id)
                .bind(product_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::CartItemNotFound(product_id));
        }

        self.view(cart_id).await
    }

    // =========================================================================
    // clear
    // =========================================================================

    /// Empty the user's cart. A user with no cart yet clears successfully.
    pub async fn clear(&self, user_id: Uuid) -> Result<(), AppError> {
        let cart_id = match self.find_cart(user_id).await? {
            Some(cart_id) => cart_id,
            None => return Ok(()),
        };

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Cart row for the user, created on first use
    async fn ensure_cart(&self, user_id: Uuid) -> Result<Uuid, AppError> {
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let cart_id: Uuid = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(cart_id)
    }

    /// Existing cart id for the user, if any
    async fn find_cart(&self, user_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let cart_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(cart_id)
    }

    /// Current stock for a product that must exist
    async fn product_stock(&self, product_id: Uuid) -> Result<i32, AppError> {
        let stock: Option<i32> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        stock.ok_or(AppError::ProductNotFound(product_id))
    }

    /// Build the client view of a cart
    async fn view(&self, cart_id: Uuid) -> Result<CartView, AppError> {
        let rows: Vec<(Uuid, String, Decimal, i32, i32)> = sqlx::query_as(
            r#"
            SELECT ci.product_id, p.name, p.price, ci.quantity, p.stock_quantity
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(CartView::from_rows(rows))
    }
}

// =========================================================================
// Unit tests (integration tests require database)
// =========================================================================
