use bo_common::Cents;
use log::debug;
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use crate::db_types::{BuyOrder, BuyOrderStatus, NewBuyOrder};

/// Inserts a new buy order in the `monitoring` state. This is not atomic. You can embed this call inside a transaction
/// if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_buy_order(order: NewBuyOrder, conn: &mut SqliteConnection) -> Result<BuyOrder, sqlx::Error> {
    let order: BuyOrder = sqlx::query_as(
        r#"
            INSERT INTO buy_orders (
                customer_id,
                merchant_id,
                product_id,
                target_price,
                current_price,
                status,
                expires_at,
                condition_value
            ) VALUES ($1, $2, $3, $4, $5, 'monitoring', $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order.customer_id)
    .bind(order.merchant_id)
    .bind(order.product_id)
    .bind(order.target_price)
    .bind(order.current_price)
    .bind(order.expires_at)
    .bind(Json(order.terms))
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Buy order #{} inserted for product #{} at {}", order.id, order.product_id, order.target_price);
    Ok(order)
}

pub async fn fetch_buy_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<BuyOrder>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM buy_orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_by_intent(intent_id: &str, conn: &mut SqliteConnection) -> Result<Option<BuyOrder>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT buy_orders.* FROM buy_orders JOIN escrow_payments ON escrow_payments.buy_order_id = buy_orders.id
            WHERE escrow_payments.payment_intent_id = $1
        "#,
    )
    .bind(intent_id)
    .fetch_optional(conn)
    .await
}

/// Fetches buy orders matching the given criteria, newest first.
pub async fn search_orders(
    customer_id: Option<i64>,
    merchant_id: Option<i64>,
    status: Option<BuyOrderStatus>,
    conn: &mut SqliteConnection,
) -> Result<Vec<BuyOrder>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM buy_orders ");
    if customer_id.is_some() || merchant_id.is_some() || status.is_some() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(id) = customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(id) = merchant_id {
        where_clause.push("merchant_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(status) = status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    builder.build_query_as::<BuyOrder>().fetch_all(conn).await
}

/// Monitoring, unexpired orders for the product that would accept `price`, best offer first.
pub async fn fulfillable_orders(
    product_id: i64,
    price: Cents,
    conn: &mut SqliteConnection,
) -> Result<Vec<BuyOrder>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM buy_orders
            WHERE product_id = $1
              AND status = 'monitoring'
              AND target_price >= $2
              AND unixepoch(expires_at) > unixepoch('now')
            ORDER BY target_price DESC, created_at ASC, id ASC
        "#,
    )
    .bind(product_id)
    .bind(price)
    .fetch_all(conn)
    .await
}

pub async fn due_for_expiry(conn: &mut SqliteConnection) -> Result<Vec<BuyOrder>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM buy_orders
            WHERE status = 'monitoring' AND unixepoch(expires_at) <= unixepoch('now')
            ORDER BY expires_at ASC, id ASC
        "#,
    )
    .fetch_all(conn)
    .await
}

/// Moves the order out of `monitoring`. Returns `None` if the order was not monitoring (e.g. a concurrent settlement
/// got there first).
pub async fn close_monitoring_order(
    id: i64,
    status: BuyOrderStatus,
    fulfilled_price: Option<Cents>,
    conn: &mut SqliteConnection,
) -> Result<Option<BuyOrder>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE buy_orders SET status = $1, fulfilled_price = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'monitoring'
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(fulfilled_price)
    .bind(id)
    .fetch_optional(conn)
    .await
}
