use sqlx::SqliteConnection;

use crate::traits::{EscrowTotals, ProductDemand, StatusCount};

pub async fn status_counts(merchant_id: i64, conn: &mut SqliteConnection) -> Result<Vec<StatusCount>, sqlx::Error> {
    sqlx::query_as(
        "SELECT status, COUNT(*) AS count FROM buy_orders WHERE merchant_id = $1 GROUP BY status ORDER BY status",
    )
    .bind(merchant_id)
    .fetch_all(conn)
    .await
}

pub async fn escrow_totals(merchant_id: i64, conn: &mut SqliteConnection) -> Result<EscrowTotals, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT
                COALESCE(SUM(CASE WHEN e.status = 'held' THEN e.escrow_amount ELSE 0 END), 0) AS held,
                COALESCE(SUM(CASE WHEN e.status = 'released' THEN e.captured_amount ELSE 0 END), 0) AS captured,
                COALESCE(SUM(CASE WHEN e.status = 'released' THEN e.platform_fee ELSE 0 END), 0) AS platform_fees,
                COALESCE(SUM(CASE WHEN e.status = 'released' THEN e.merchant_share ELSE 0 END), 0) AS merchant_earnings
            FROM escrow_payments e JOIN buy_orders b ON b.id = e.buy_order_id
            WHERE b.merchant_id = $1
        "#,
    )
    .bind(merchant_id)
    .fetch_one(conn)
    .await
}

pub async fn product_count(merchant_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM products WHERE merchant_id = $1").bind(merchant_id).fetch_one(conn).await?;
    Ok(count)
}

pub async fn product_demand(merchant_id: i64, conn: &mut SqliteConnection) -> Result<Vec<ProductDemand>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT
                p.id AS product_id,
                p.title AS title,
                p.current_price AS current_price,
                COUNT(b.id) AS monitoring_orders,
                COALESCE(MAX(b.target_price), 0) AS highest_target,
                COALESCE(CAST(ROUND(AVG(b.target_price)) AS INTEGER), 0) AS average_target,
                COALESCE(SUM(b.target_price), 0) AS held_amount
            FROM products p LEFT JOIN buy_orders b ON b.product_id = p.id AND b.status = 'monitoring'
            WHERE p.merchant_id = $1
            GROUP BY p.id
            ORDER BY monitoring_orders DESC, p.id ASC
        "#,
    )
    .bind(merchant_id)
    .fetch_all(conn)
    .await
}
