use sqlx::SqliteConnection;

use crate::db_types::{Credentials, Customer, Merchant, NewAccount};

pub async fn insert_customer(account: NewAccount, conn: &mut SqliteConnection) -> Result<Customer, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO customers (email, name, password_hash) VALUES ($1, $2, $3)
            RETURNING id, email, name, created_at, updated_at;
        "#,
    )
    .bind(account.email.to_lowercase())
    .bind(account.name)
    .bind(account.password_hash)
    .fetch_one(conn)
    .await
}

pub async fn insert_merchant(account: NewAccount, conn: &mut SqliteConnection) -> Result<Merchant, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO merchants (email, name, password_hash) VALUES ($1, $2, $3)
            RETURNING id, email, name, stripe_account_id, charges_enabled, status, created_at, updated_at;
        "#,
    )
    .bind(account.email.to_lowercase())
    .bind(account.name)
    .bind(account.password_hash)
    .fetch_one(conn)
    .await
}

pub async fn fetch_customer(id: i64, conn: &mut SqliteConnection) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as("SELECT id, email, name, created_at, updated_at FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_merchant(id: i64, conn: &mut SqliteConnection) -> Result<Option<Merchant>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT id, email, name, stripe_account_id, charges_enabled, status, created_at, updated_at
            FROM merchants WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_customer_by_email(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as("SELECT id, email, name, created_at, updated_at FROM customers WHERE email = $1")
        .bind(email.to_lowercase())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_merchant_by_email(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT id, email, name, stripe_account_id, charges_enabled, status, created_at, updated_at
            FROM merchants WHERE email = $1
        "#,
    )
    .bind(email.to_lowercase())
    .fetch_optional(conn)
    .await
}

pub async fn customer_credentials(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Credentials>, sqlx::Error> {
    sqlx::query_as("SELECT id, email, password_hash FROM customers WHERE email = $1")
        .bind(email.to_lowercase())
        .fetch_optional(conn)
        .await
}

pub async fn merchant_credentials(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Credentials>, sqlx::Error> {
    sqlx::query_as("SELECT id, email, password_hash FROM merchants WHERE email = $1")
        .bind(email.to_lowercase())
        .fetch_optional(conn)
        .await
}

pub async fn set_stripe_account(
    merchant_id: i64,
    account_id: &str,
    charges_enabled: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE merchants SET stripe_account_id = $1, charges_enabled = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING id, email, name, stripe_account_id, charges_enabled, status, created_at, updated_at;
        "#,
    )
    .bind(account_id)
    .bind(charges_enabled)
    .bind(merchant_id)
    .fetch_optional(conn)
    .await
}

pub async fn set_charges_enabled(
    account_id: &str,
    charges_enabled: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE merchants SET charges_enabled = $1, updated_at = CURRENT_TIMESTAMP WHERE stripe_account_id = $2
            RETURNING id, email, name, stripe_account_id, charges_enabled, status, created_at, updated_at;
        "#,
    )
    .bind(charges_enabled)
    .bind(account_id)
    .fetch_optional(conn)
    .await
}
