use bo_common::Cents;
use sqlx::SqliteConnection;

use crate::db_types::{EscrowPayment, EscrowStatus, EscrowTerms};

pub async fn insert_escrow(
    buy_order_id: i64,
    terms: &EscrowTerms,
    conn: &mut SqliteConnection,
) -> Result<EscrowPayment, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO escrow_payments (buy_order_id, payment_intent_id, escrow_amount, platform_fee, merchant_share)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(buy_order_id)
    .bind(&terms.payment_intent_id)
    .bind(terms.escrow_amount)
    .bind(terms.platform_fee)
    .bind(terms.merchant_share)
    .fetch_one(conn)
    .await
}

pub async fn fetch_for_order(
    buy_order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<EscrowPayment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM escrow_payments WHERE buy_order_id = $1").bind(buy_order_id).fetch_optional(conn).await
}

/// Marks a held escrow as released, recording what was actually captured and how it was split.
pub async fn release(
    buy_order_id: i64,
    captured: Cents,
    platform_fee: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<EscrowPayment>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE escrow_payments SET
                status = $1,
                captured_amount = $2,
                platform_fee = $3,
                merchant_share = $2 - $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE buy_order_id = $4 AND status = 'held'
            RETURNING *;
        "#,
    )
    .bind(EscrowStatus::Released)
    .bind(captured)
    .bind(platform_fee)
    .bind(buy_order_id)
    .fetch_optional(conn)
    .await
}

pub async fn refund(buy_order_id: i64, conn: &mut SqliteConnection) -> Result<Option<EscrowPayment>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE escrow_payments SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE buy_order_id = $2 AND status = 'held'
            RETURNING *;
        "#,
    )
    .bind(EscrowStatus::Refunded)
    .bind(buy_order_id)
    .fetch_optional(conn)
    .await
}
