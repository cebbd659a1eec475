use sqlx::SqliteConnection;

use crate::db_types::{LedgerEntry, LedgerState, NewLedgerEntry};

pub async fn insert_entry(entry: NewLedgerEntry, conn: &mut SqliteConnection) -> Result<LedgerEntry, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO escrow_ledger (
                buy_order_id,
                payment_intent_id,
                action,
                amount,
                platform_fee,
                idempotency_key,
                resolves_to
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(entry.buy_order_id)
    .bind(entry.payment_intent_id)
    .bind(entry.action)
    .bind(entry.amount)
    .bind(entry.platform_fee)
    .bind(entry.idempotency_key)
    .bind(entry.resolves_to)
    .fetch_one(conn)
    .await
}

pub async fn fetch_entry(id: i64, conn: &mut SqliteConnection) -> Result<Option<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM escrow_ledger WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Records the intent id on a pending entry. Returns `None` if the entry is no longer pending.
pub async fn set_intent(
    id: i64,
    intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerEntry>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE escrow_ledger SET payment_intent_id = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND state = 'pending'
            RETURNING *;
        "#,
    )
    .bind(intent_id)
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Moves a pending entry to its final state. Returns `None` if the entry had already been settled.
pub async fn settle_entry(
    id: i64,
    state: LedgerState,
    buy_order_id: Option<i64>,
    detail: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerEntry>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE escrow_ledger SET
                state = $1,
                buy_order_id = COALESCE($2, buy_order_id),
                detail = COALESCE($3, detail),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND state = 'pending'
            RETURNING *;
        "#,
    )
    .bind(state)
    .bind(buy_order_id)
    .bind(detail)
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn pending_for_intent(intent_id: &str, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM escrow_ledger WHERE payment_intent_id = $1 AND state = 'pending' ORDER BY id")
        .bind(intent_id)
        .fetch_all(conn)
        .await
}

pub async fn stale_pending(older_than_secs: i64, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM escrow_ledger
            WHERE state = 'pending' AND unixepoch(updated_at) <= unixepoch('now') - $1
            ORDER BY id
        "#,
    )
    .bind(older_than_secs)
    .fetch_all(conn)
    .await
}

pub async fn entries_for_order(buy_order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM escrow_ledger WHERE buy_order_id = $1 ORDER BY id")
        .bind(buy_order_id)
        .fetch_all(conn)
        .await
}
