//! Demo Data Seeder
//!
//! Seeds users, sessions, and a small product catalog for manual testing.
//! Run with: cargo run --bin seed_demo
//!
//! Prints the session tokens to use in the X-Session-Token header.

use sqlx::postgres::PgPoolOptions;

use storefront_api::api::middleware::sha256_hex;

const ADMIN_ID: &str = "11111111-1111-1111-1111-111111111111";
const CUSTOMER_ID: &str = "22222222-2222-2222-2222-222222222222";
const SHOPPER_ID: &str = "33333333-3333-3333-3333-333333333333";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Seeding demo data...");
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    // Users
    let users = [
        (ADMIN_ID, "admin@storefront.test", true),
        (CUSTOMER_ID, "customer@storefront.test", false),
        (SHOPPER_ID, "shopper@storefront.test", false),
    ];

    for (id, email, is_admin) in users {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, is_admin)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(uuid::Uuid::parse_str(id)?)
        .bind(email)
        .bind(is_admin)
        .execute(&pool)
        .await?;
    }

    // Sessions, one fresh token per user per run
    println!("\n=== Session tokens (X-Session-Token) ===");
    for (id, email, _) in users {
        let token = random_token();

        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, user_id, expires_at)
            VALUES ($1, $2, NOW() + INTERVAL '30 days')
            "#,
        )
        .bind(sha256_hex(&token))
        .bind(uuid::Uuid::parse_str(id)?)
        .execute(&pool)
        .await?;

        println!("{}: {}", email, token);
    }

    // Products; re-running restores stock and prices
    let products = [
        ("aaaaaaaa-0000-0000-0000-000000000001", "Walnut Desk Organizer", "29.99", 25),
        ("aaaaaaaa-0000-0000-0000-000000000002", "Ceramic Pour-Over Set", "18.50", 40),
        ("aaaaaaaa-0000-0000-0000-000000000003", "Linen Throw Pillow", "34.00", 12),
        ("aaaaaaaa-0000-0000-0000-000000000004", "Brass Bookends (Pair)", "52.75", 8),
        ("aaaaaaaa-0000-0000-0000-000000000005", "Recycled Paper Notebook", "6.25", 200),
    ];

    println!("\n=== Products ===");
    for (id, name, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, stock_quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                price = EXCLUDED.price,
                stock_quantity = EXCLUDED.stock_quantity,
                updated_at = NOW()
            "#,
        )
        .bind(uuid::Uuid::parse_str(id)?)
        .bind(name)
        .bind(price.parse::<rust_decimal::Decimal>()?)
        .bind(stock)
        .execute(&pool)
        .await?;

        println!("{}  {:<26} {:>8}  stock {}", id, name, price, stock);
    }

    println!("\nDone. Try:");
    println!("  curl -H \"X-Session-Token: <token>\" http://127.0.0.1:3000/api/v1/cart");

    Ok(())
}

/// Opaque bearer token, 48 hex chars
fn random_token() -> String {
    use rand::Rng;

    let bytes: [u8; 24] = rand::thread_rng().gen();
    hex::encode(bytes)
}
