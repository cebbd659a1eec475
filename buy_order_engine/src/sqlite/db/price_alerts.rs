use bo_common::Cents;
use sqlx::SqliteConnection;

use crate::db_types::{NewPriceAlert, PriceAlert};

pub async fn insert_alert(alert: NewPriceAlert, conn: &mut SqliteConnection) -> Result<PriceAlert, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO price_alerts (customer_id, product_id, email, target_price) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(alert.customer_id)
    .bind(alert.product_id)
    .bind(alert.email)
    .bind(alert.target_price)
    .fetch_one(conn)
    .await
}

pub async fn fetch_alert(id: i64, conn: &mut SqliteConnection) -> Result<Option<PriceAlert>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM price_alerts WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn alerts_for_customer(customer_id: i64, conn: &mut SqliteConnection) -> Result<Vec<PriceAlert>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM price_alerts WHERE customer_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(customer_id)
        .fetch_all(conn)
        .await
}

/// Withdraws an active alert. Returns `None` if the alert was not active.
pub async fn expire_alert(id: i64, conn: &mut SqliteConnection) -> Result<Option<PriceAlert>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE price_alerts SET status = 'expired', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'active'
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn delete_alert(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM price_alerts WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn trigger_for_price(
    product_id: i64,
    price: Cents,
    conn: &mut SqliteConnection,
) -> Result<Vec<PriceAlert>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE price_alerts SET status = 'triggered', triggered_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE product_id = $1 AND status = 'active' AND target_price >= $2
            RETURNING *;
        "#,
    )
    .bind(product_id)
    .bind(price)
    .fetch_all(conn)
    .await
}
