//! Rating aggregator
//!
//! Recomputes a product's review statistics and publishes the denormalized
//! result (`products.rating`, `products.review_count`) that catalog
//! browsing reads.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::RatingStats;
use crate::error::AppError;

/// Aggregator for product review statistics
#[derive(Debug, Clone)]
pub struct RatingAggregator {
    pool: PgPool,
}

impl RatingAggregator {
    /// Create a new RatingAggregator
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // compute_stats
    // =========================================================================

    /// Aggregate statistics over a product's current reviews.
    pub async fn compute_stats(&self, product_id: Uuid) -> Result<RatingStats, AppError> {
        let rows: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT rating, COUNT(*)
            FROM reviews
            WHERE product_id = $1
            GROUP BY rating
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(RatingStats::from_rows(&rows))
    }

    // =========================================================================
    // publish
    // =========================================================================

    /// Recompute and write the product's rating fields in one transaction.
    pub async fn publish(&self, product_id: Uuid) -> Result<RatingStats, AppError> {
        let mut tx = self.pool.begin().await?;

        lock_product(&mut tx, product_id).await?;
        let stats = self.publish_in_tx(&mut tx, product_id).await?;

        tx.commit().await?;

        tracing::debug!(
            "Published rating for product {}: {} over {} reviews",
            product_id,
            stats.average_rating,
            stats.total_reviews
        );

        Ok(stats)
    }

    /// Recompute and write within a caller transaction. The caller must
    /// already hold the product row lock.
    pub async fn publish_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_id: Uuid,
    ) -> Result<RatingStats, AppError> {
        let rows: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT rating, COUNT(*)
            FROM reviews
            WHERE product_id = $1
            GROUP BY rating
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut **tx)
        .await?;

        let stats = RatingStats::from_rows(&rows);

        sqlx::query(
            r#"
            UPDATE products
            SET rating = $2, review_count = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .bind(stats.average_rating)
        .bind(stats.total_reviews as i32)
        .execute(&mut **tx)
        .await?;

        Ok(stats)
    }
}

/// Lock the product row, serializing concurrent aggregate writers on it.
pub(crate) async fn lock_product(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> Result<(), AppError> {
    let found: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(AppError::ProductNotFound(product_id)),
    }
}
