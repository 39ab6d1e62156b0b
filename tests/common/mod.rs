//! Common test utilities
//!
//! Integration tests need a real Postgres (schema from migrations/ applied).
//! When DATABASE_URL is not set the tests skip instead of failing, so the
//! unit suite stays runnable without infrastructure.

#![allow(dead_code)]

use axum::{middleware, Router};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use banca_core::domain::Iban;
use banca_core::handlers::{hash_password, hash_token};
use banca_core::ledger::generate_account_number;
use banca_core::{api, AppState, Config};

/// Connect to the test database, or None when DATABASE_URL is unset.
pub async fn try_setup() -> Option<PgPool> {
    dotenvy::dotenv().ok();

    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping: DATABASE_URL not set");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test DB");

    Some(pool)
}

/// Build the app the way main.rs does, minus the trace layer.
pub fn test_app(state: AppState) -> Router {
    let protected = api::create_router().layer(middleware::from_fn_with_state(
        state.clone(),
        api::middleware::auth_middleware,
    ));

    Router::new()
        .merge(api::create_public_router())
        .nest("/api/v1", protected)
        .with_state(state)
}

/// Test state with notification routing disabled.
pub fn test_state(pool: PgPool) -> AppState {
    test_state_with_admin_target(pool, None)
}

pub fn test_state_with_admin_target(pool: PgPool, admin: Option<Uuid>) -> AppState {
    let config = Config {
        database_url: String::new(),
        database_max_connections: 5,
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        token_ttl_days: 7,
        admin_notify_user_id: admin,
    };
    AppState::new(pool, config)
}

/// A seeded user with an active main account and a valid bearer token.
pub struct TestUser {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub iban: String,
    pub phone: String,
    pub token: String,
}

/// Random valid Spanish mobile number (unique enough per test run).
pub fn random_phone() -> String {
    let mut rng = rand::thread_rng();
    format!("6{:08}", rng.gen_range(0..=99_999_999u32))
}

/// Seed a user, their main account and a session token directly in SQL.
/// Identities are randomized so concurrent tests never collide.
pub async fn seed_user(pool: &PgPool, name: &str, role: &str, balance: Decimal) -> TestUser {
    seed_user_with_phone(pool, name, role, balance, &random_phone()).await
}

pub async fn seed_user_with_phone(
    pool: &PgPool,
    name: &str,
    role: &str,
    balance: Decimal,
    phone: &str,
) -> TestUser {
    let user_id = Uuid::new_v4();
    let suffix = &user_id.simple().to_string()[..12];
    let salt = "testsalt";

    sqlx::query(
        r#"
        INSERT INTO users (
            id, name, surname, birth_date, dni, country, city, address,
            postal_code, email, phone, password_hash, password_salt,
            main_currency, role
        )
        VALUES ($1, $2, 'Tester', '1990-01-01', $3, 'ES', 'Madrid', 'C/ Test 1',
                '28001', $4, $5, $6, $7, 'EUR', $8)
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(format!("DNI{}", suffix))
    .bind(format!("{}-{}@example.com", name, suffix))
    .bind(phone)
    .bind(hash_password(salt, "password123"))
    .bind(salt)
    .bind(role)
    .execute(pool)
    .await
    .expect("Failed to seed user");

    let account_id = Uuid::new_v4();
    let account_number = generate_account_number();
    let iban = Iban::generate_spanish(&account_number);

    sqlx::query(
        r#"
        INSERT INTO accounts (
            id, owner_id, iban, account_number, currency, balance,
            alias, status, is_main
        )
        VALUES ($1, $2, $3, $4, 'EUR', $5, 'Main account', 'active', true)
        "#,
    )
    .bind(account_id)
    .bind(user_id)
    .bind(iban.as_str())
    .bind(&account_number)
    .bind(balance)
    .execute(pool)
    .await
    .expect("Failed to seed account");

    let token = format!("test-token-{}", user_id.simple());
    sqlx::query(
        "INSERT INTO auth_tokens (token_hash, user_id, expires_at) \
         VALUES ($1, $2, NOW() + INTERVAL '1 day')",
    )
    .bind(hash_token(&token))
    .bind(user_id)
    .execute(pool)
    .await
    .expect("Failed to seed token");

    TestUser {
        user_id,
        account_id,
        iban: iban.to_string(),
        phone: phone.to_string(),
        token,
    }
}

/// Current balance of an account.
pub async fn account_balance(pool: &PgPool, account_id: Uuid) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}
