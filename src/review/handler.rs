//! Review handler
//!
//! Review writes with the aggregate republish folded into the same
//! transaction. The product row lock serializes concurrent writers, so
//! the published rating always reflects every committed review and a
//! review can never be saved without its aggregate refresh.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::middleware::CurrentUser;
use crate::domain::{RatingStats, StarRating};
use crate::error::{is_unique_violation, AppError};

use super::aggregator::{lock_product, RatingAggregator};
use super::{SubmitReviewCommand, UpdateReviewCommand};

/// Unique pair (product_id, user_id): one review per user per product
const REVIEW_UNIQUE_CONSTRAINT: &str = "reviews_product_id_user_id_key";

/// A review as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Handler for review writes
pub struct ReviewHandler {
    pool: PgPool,
    aggregator: RatingAggregator,
}

impl ReviewHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            aggregator: RatingAggregator::new(pool.clone()),
            pool,
        }
    }

    // =========================================================================
    // create
    // =========================================================================

    /// Submit a review. One review per user per product; a duplicate is a
    /// conflict. The aggregate is republished before the transaction
    /// commits.
    pub async fn create(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        command: SubmitReviewCommand,
    ) -> Result<(ReviewView, RatingStats), AppError> {
        let rating = StarRating::new(command.rating)?;

        let mut tx = self.pool.begin().await?;

        lock_product(&mut tx, product_id).await?;

        let review_id = Uuid::new_v4();
        let (created_at, updated_at): (DateTime<Utc>, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO reviews (id, product_id, user_id, rating, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at, updated_at
            "#,
        )
        .bind(review_id)
        .bind(product_id)
        .bind(user_id)
        .bind(rating.value())
        .bind(&command.body)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, REVIEW_UNIQUE_CONSTRAINT) {
                AppError::DuplicateReview
            } else {
                AppError::Database(e)
            }
        })?;

        let stats = self.aggregator.publish_in_tx(&mut tx, product_id).await?;

        tx.commit().await?;

        tracing::info!(
            "Review {} created for product {} by user {}",
            review_id,
            product_id,
            user_id
        );

        Ok((
            ReviewView {
                id: review_id,
                product_id,
                user_id,
                rating: rating.value(),
                body: command.body,
                created_at,
                updated_at,
            },
            stats,
        ))
    }

    // =========================================================================
    // update
    // =========================================================================

    /// Update a review's rating and/or body. Only the author or an
    /// administrator may update; authorization is checked before any write.
    pub async fn update(
        &self,
        review_id: Uuid,
        caller: &CurrentUser,
        command: UpdateReviewCommand,
    ) -> Result<(ReviewView, RatingStats), AppError> {
        let rating = match command.rating {
            Some(value) => Some(StarRating::new(value)?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let (product_id, author_id) = self.find_review(&mut tx, review_id).await?;

        if !caller.can_act_for(author_id) {
            return Err(AppError::Forbidden(
                "Only the review author or an administrator may modify it".to_string(),
            ));
        }

        lock_product(&mut tx, product_id).await?;

        let (new_rating, new_body, created_at, updated_at): (
            i32,
            String,
            DateTime<Utc>,
            DateTime<Utc>,
        ) = sqlx::query_as(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                body = COALESCE($3, body),
                updated_at = NOW()
            WHERE id = $1
            RETURNING rating, body, created_at, updated_at
            "#,
        )
        .bind(review_id)
        .bind(rating.map(|r| r.value()))
        .bind(command.body.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let stats = self.aggregator.publish_in_tx(&mut tx, product_id).await?;

        tx.commit().await?;

        Ok((
            ReviewView {
                id: review_id,
                product_id,
                user_id: author_id,
                rating: new_rating,
                body: new_body,
                created_at,
                updated_at,
            },
            stats,
        ))
    }

    // =========================================================================
    // delete
    // =========================================================================

    /// Delete a review. Only the author or an administrator may delete;
    /// the aggregate is republished before the transaction commits.
    pub async fn delete(
        &self,
        review_id: Uuid,
        caller: &CurrentUser,
    ) -> Result<RatingStats, AppError> {
        let mut tx = self.pool.begin().await?;

        let (product_id, author_id) = self.find_review(&mut tx, review_id).await?;

        if !caller.can_act_for(author_id) {
            return Err(AppError::Forbidden(
                "Only the review author or an administrator may modify it".to_string(),
            ));
        }

        lock_product(&mut tx, product_id).await?;

        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&mut *tx)
            .await?;

        let stats = self.aggregator.publish_in_tx(&mut tx, product_id).await?;

        tx.commit().await?;

        tracing::info!("Review {} deleted from product {}", review_id, product_id);

        Ok(stats)
    }

    /// Resolve a review to its product and author
    async fn find_review(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        review_id: Uuid,
    ) -> Result<(Uuid, Uuid), AppError> {
        let target: Option<(Uuid, Uuid)> =
            sqlx::query_as("SELECT product_id, user_id FROM reviews WHERE id = $1")
                .bind(review_id)
                .fetch_optional(&mut **tx)
                .await?;

        target.ok_or(AppError::ReviewNotFound(review_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rejects_out_of_range_rating_before_any_io() {
        // StarRating validation happens before the transaction starts
        let result = StarRating::new(0);
        assert!(result.is_err());
        let result = StarRating::new(6);
        assert!(result.is_err());
    }

    #[test]
    fn test_author_may_modify_own_review() {
        let author = Uuid::new_v4();
        let caller = CurrentUser {
            user_id: author,
            is_admin: false,
        };
        assert!(caller.can_act_for(author));
    }

    #[test]
    fn test_stranger_may_not_modify_review() {
        let caller = CurrentUser {
            user_id: Uuid::new_v4(),
            is_admin: false,
        };
        assert!(!caller.can_act_for(Uuid::new_v4()));
    }

    #[test]
    fn test_admin_may_modify_any_review() {
        let caller = CurrentUser {
            user_id: Uuid::new_v4(),
            is_admin: true,
        };
        assert!(caller.can_act_for(Uuid::new_v4()));
    }
}
