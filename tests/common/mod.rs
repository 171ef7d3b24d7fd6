//! Common test utilities

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use storefront_api::api::middleware::sha256_hex;

// Seeded identities. setup_test_db inserts a session for each token.
pub const ADMIN_ID: &str = "00000000-0000-0000-0000-0000000000a1";
pub const CUSTOMER_ID: &str = "00000000-0000-0000-0000-0000000000c1";
pub const SECOND_CUSTOMER_ID: &str = "00000000-0000-0000-0000-0000000000c2";

pub const ADMIN_TOKEN: &str = "admin_token_456";
pub const CUSTOMER_TOKEN: &str = "cust_token_123";
pub const SECOND_CUSTOMER_TOKEN: &str = "cust2_token_789";

// Seeded products
pub const DESK_ORGANIZER_ID: &str = "aaaaaaaa-0000-0000-0000-000000000001"; // 29.99, stock 5
pub const POUR_OVER_ID: &str = "aaaaaaaa-0000-0000-0000-000000000002"; // 18.50, stock 2
pub const NOTEBOOK_ID: &str = "aaaaaaaa-0000-0000-0000-000000000003"; // 6.25, stock 0

/// Setup test database - truncate tables and seed test data
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    // Clean up DB for fresh state
    sqlx::query(
        "TRUNCATE TABLE reviews, order_items, orders, cart_items, carts, sessions, products, users CASCADE",
    )
    .execute(&mut *tx)
    .await
    .expect("Failed to clean up DB");

    // Seed users
    for (id, email, is_admin) in [
        (ADMIN_ID, "admin@test.local", true),
        (CUSTOMER_ID, "customer@test.local", false),
        (SECOND_CUSTOMER_ID, "shopper@test.local", false),
    ] {
        sqlx::query("INSERT INTO users (id, email, is_admin) VALUES ($1, $2, $3)")
            .bind(parse_uuid(id))
            .bind(email)
            .bind(is_admin)
            .execute(&mut *tx)
            .await
            .expect("Failed to seed user");
    }

    // Seed sessions, hashed exactly as the auth middleware hashes tokens
    for (token, user_id) in [
        (ADMIN_TOKEN, ADMIN_ID),
        (CUSTOMER_TOKEN, CUSTOMER_ID),
        (SECOND_CUSTOMER_TOKEN, SECOND_CUSTOMER_ID),
    ] {
        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, user_id, expires_at)
            VALUES ($1, $2, NOW() + INTERVAL '1 day')
            "#,
        )
        .bind(sha256_hex(token))
        .bind(parse_uuid(user_id))
        .execute(&mut *tx)
        .await
        .expect("Failed to seed session");
    }

    // Seed products
    for (id, name, price, stock) in [
        (DESK_ORGANIZER_ID, "Walnut Desk Organizer", "29.99", 5),
        (POUR_OVER_ID, "Ceramic Pour-Over Set", "18.50", 2),
        (NOTEBOOK_ID, "Recycled Paper Notebook", "6.25", 0),
    ] {
        sqlx::query(
            "INSERT INTO products (id, name, price, stock_quantity) VALUES ($1, $2, $3, $4)",
        )
        .bind(parse_uuid(id))
        .bind(name)
        .bind(price.parse::<rust_decimal::Decimal>().unwrap())
        .bind(stock)
        .execute(&mut *tx)
        .await
        .expect("Failed to seed product");
    }

    tx.commit().await.expect("Failed to commit transaction");

    pool
}

pub fn parse_uuid(s: &str) -> uuid::Uuid {
    s.parse().expect("valid uuid literal")
}
