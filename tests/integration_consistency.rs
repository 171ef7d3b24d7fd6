//! Integration tests for checkout and review consistency
//!
//! Drives the handlers directly against a live database to exercise the
//! transactional guarantees: all-or-nothing checkout, no oversell under
//! concurrency, and a published rating that never drifts from the rows.

use std::collections::HashSet;

use rust_decimal_macros::dec;
use uuid::Uuid;

use storefront_api::checkout::{CheckoutHandler, CreateOrderCommand, OrderItemInput};
use storefront_api::review::{RatingAggregator, ReviewHandler, SubmitReviewCommand};
use storefront_api::{is_unique_violation, AppError, OrderNumber};

mod common;

#[serial_test::serial]
#[tokio::test]
async fn test_failed_checkout_rolls_back_earlier_decrements() {
    let pool = common::setup_test_db().await;
    let handler = CheckoutHandler::new(pool.clone());
    let customer = common::parse_uuid(common::CUSTOMER_ID);

    // The second line oversells; the first line's decrement must not stick
    let command = CreateOrderCommand::new(
        vec![
            OrderItemInput::new(common::parse_uuid(common::DESK_ORGANIZER_ID), 1),
            OrderItemInput::new(common::parse_uuid(common::POUR_OVER_ID), 3),
        ],
        "85.49".to_string(),
    );

    let result = handler.create_order(customer, command).await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        })
    ));

    let desk_stock: i32 = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(common::parse_uuid(common::DESK_ORGANIZER_ID))
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(desk_stock, 5, "rolled-back decrement leaked");

    let order_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(order_count, 0);

    let item_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(item_count, 0);
}

#[serial_test::serial]
#[tokio::test]
async fn test_concurrent_checkouts_never_oversell() {
    let pool = common::setup_test_db().await;
    let handler = CheckoutHandler::new(pool.clone());
    let pour_over = common::parse_uuid(common::POUR_OVER_ID);

    // Stock is 2; two competing orders each want 2
    let command_a = CreateOrderCommand::new(
        vec![OrderItemInput::new(pour_over, 2)],
        "37.00".to_string(),
    );
    let command_b = CreateOrderCommand::new(
        vec![OrderItemInput::new(pour_over, 2)],
        "37.00".to_string(),
    );

    let (a, b) = tokio::join!(
        handler.create_order(common::parse_uuid(common::CUSTOMER_ID), command_a),
        handler.create_order(common::parse_uuid(common::SECOND_CUSTOMER_ID), command_b),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one competing order must win");

    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(AppError::InsufficientStock { .. })));

    let stock: i32 = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(pour_over)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stock, 0);

    let order_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(order_count, 1);
}

#[serial_test::serial]
#[tokio::test]
async fn test_checkout_handles_repeated_product_lines() {
    let pool = common::setup_test_db().await;
    let handler = CheckoutHandler::new(pool.clone());
    let customer = common::parse_uuid(common::CUSTOMER_ID);
    let desk = common::parse_uuid(common::DESK_ORGANIZER_ID);

    // Two lines for the same product decrement cumulatively
    let command = CreateOrderCommand::new(
        vec![OrderItemInput::new(desk, 2), OrderItemInput::new(desk, 2)],
        "119.96".to_string(),
    );
    let result = handler.create_order(customer, command).await.unwrap();
    assert_eq!(result.total_amount, dec!(119.96));

    let stock: i32 = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(desk)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stock, 1);

    let line_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
        .bind(result.order_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(line_count, 2);

    // Combined lines above remaining stock fail as a whole
    let command = CreateOrderCommand::new(
        vec![OrderItemInput::new(desk, 1), OrderItemInput::new(desk, 1)],
        "59.98".to_string(),
    );
    let result = handler.create_order(customer, command).await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientStock {
            requested: 1,
            available: 0,
            ..
        })
    ));

    let stock: i32 = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(desk)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stock, 1, "failed order must not consume stock");
}

#[serial_test::serial]
#[tokio::test]
async fn test_concurrent_reviews_keep_aggregate_exact() {
    let pool = common::setup_test_db().await;
    let handler = ReviewHandler::new(pool.clone());
    let product = common::parse_uuid(common::DESK_ORGANIZER_ID);

    let (a, b) = tokio::join!(
        handler.create(
            common::parse_uuid(common::CUSTOMER_ID),
            product,
            SubmitReviewCommand::new(5, "Great piece".to_string()),
        ),
        handler.create(
            common::parse_uuid(common::SECOND_CUSTOMER_ID),
            product,
            SubmitReviewCommand::new(2, "Not for me".to_string()),
        ),
    );

    // Different users, so both must land
    a.unwrap();
    b.unwrap();

    let (published, count): (rust_decimal::Decimal, i32) =
        sqlx::query_as("SELECT rating, review_count FROM products WHERE id = $1")
            .bind(product)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(published, dec!(3.5));
    assert_eq!(count, 2);

    // The published figures match a fresh recomputation
    let aggregator = RatingAggregator::new(pool.clone());
    let fresh = aggregator.compute_stats(product).await.unwrap();
    assert_eq!(published, fresh.average_rating);
    assert_eq!(count as i64, fresh.total_reviews);
}

#[serial_test::serial]
#[tokio::test]
async fn test_publish_repairs_stale_denormalized_rating() {
    let pool = common::setup_test_db().await;
    let product = common::parse_uuid(common::DESK_ORGANIZER_ID);

    // Review rows written behind the handler's back leave the product copy stale
    for (user, rating) in [(common::CUSTOMER_ID, 5), (common::SECOND_CUSTOMER_ID, 3)] {
        sqlx::query(
            "INSERT INTO reviews (id, product_id, user_id, rating, body) VALUES ($1, $2, $3, $4, '')",
        )
        .bind(Uuid::new_v4())
        .bind(product)
        .bind(common::parse_uuid(user))
        .bind(rating)
        .execute(&pool)
        .await
        .unwrap();
    }

    let (stale_rating, stale_count): (rust_decimal::Decimal, i32) =
        sqlx::query_as("SELECT rating, review_count FROM products WHERE id = $1")
            .bind(product)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stale_rating, dec!(0.0));
    assert_eq!(stale_count, 0);

    let aggregator = RatingAggregator::new(pool.clone());
    let stats = aggregator.publish(product).await.unwrap();
    assert_eq!(stats.average_rating, dec!(4.0));
    assert_eq!(stats.total_reviews, 2);

    let (published, count): (rust_decimal::Decimal, i32) =
        sqlx::query_as("SELECT rating, review_count FROM products WHERE id = $1")
            .bind(product)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(published, dec!(4.0));
    assert_eq!(count, 2);
}

#[serial_test::serial]
#[tokio::test]
async fn test_second_review_by_same_user_conflicts() {
    let pool = common::setup_test_db().await;
    let handler = ReviewHandler::new(pool.clone());
    let product = common::parse_uuid(common::POUR_OVER_ID);
    let customer = common::parse_uuid(common::CUSTOMER_ID);

    handler
        .create(
            customer,
            product,
            SubmitReviewCommand::new(4, "Nice spout".to_string()),
        )
        .await
        .unwrap();

    let result = handler
        .create(
            customer,
            product,
            SubmitReviewCommand::new(1, "second thoughts".to_string()),
        )
        .await;
    assert!(matches!(result, Err(AppError::DuplicateReview)));

    let count: i32 = sqlx::query_scalar("SELECT review_count FROM products WHERE id = $1")
        .bind(product)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[serial_test::serial]
#[tokio::test]
async fn test_order_numbers_unique_across_burst() {
    let pool = common::setup_test_db().await;
    let handler = CheckoutHandler::new(pool.clone());
    let customer = common::parse_uuid(common::CUSTOMER_ID);
    let desk = common::parse_uuid(common::DESK_ORGANIZER_ID);

    sqlx::query("UPDATE products SET stock_quantity = 1000 WHERE id = $1")
        .bind(desk)
        .execute(&pool)
        .await
        .unwrap();

    let mut numbers = HashSet::new();
    for _ in 0..30 {
        let command = CreateOrderCommand::new(
            vec![OrderItemInput::new(desk, 1)],
            "29.99".to_string(),
        );
        let result = handler.create_order(customer, command).await.unwrap();

        // Every number is well-formed and unseen
        let parsed: OrderNumber = result.order_number.parse().unwrap();
        assert_eq!(parsed.as_str(), result.order_number);
        assert!(
            numbers.insert(result.order_number.clone()),
            "duplicate order number {}",
            result.order_number
        );
    }
}

#[serial_test::serial]
#[tokio::test]
async fn test_duplicate_order_number_is_classified() {
    let pool = common::setup_test_db().await;
    let customer = common::parse_uuid(common::CUSTOMER_ID);

    // Force the collision the checkout retry loop defends against
    let number = OrderNumber::generate(chrono::Utc::now());

    sqlx::query(
        "INSERT INTO orders (id, user_id, order_number, total_amount, status) VALUES ($1, $2, $3, 1.00, 'pending')",
    )
    .bind(Uuid::new_v4())
    .bind(customer)
    .bind(number.as_str())
    .execute(&pool)
    .await
    .unwrap();

    let err = sqlx::query(
        "INSERT INTO orders (id, user_id, order_number, total_amount, status) VALUES ($1, $2, $3, 1.00, 'pending')",
    )
    .bind(Uuid::new_v4())
    .bind(customer)
    .bind(number.as_str())
    .execute(&pool)
    .await
    .unwrap_err();

    assert!(is_unique_violation(&err, "orders_order_number_key"));
    assert!(!is_unique_violation(&err, "reviews_product_id_user_id_key"));
}
