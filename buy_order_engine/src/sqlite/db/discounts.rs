use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{MerchantDiscount, NewDiscount};

pub async fn insert_discount(
    merchant_id: i64,
    discount: NewDiscount,
    conn: &mut SqliteConnection,
) -> Result<MerchantDiscount, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO merchant_discounts (
                merchant_id,
                product_id,
                discount_price,
                customer_ids,
                order_ids,
                max_uses,
                expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(merchant_id)
    .bind(discount.product_id)
    .bind(discount.discount_price)
    .bind(Json(discount.customer_ids))
    .bind(Json(discount.order_ids))
    .bind(discount.max_uses)
    .bind(discount.expires_at)
    .fetch_one(conn)
    .await
}

pub async fn fetch_discount(id: i64, conn: &mut SqliteConnection) -> Result<Option<MerchantDiscount>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM merchant_discounts WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn active_for_product(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<MerchantDiscount>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM merchant_discounts
            WHERE product_id = $1
              AND status = 'active'
              AND (max_uses IS NULL OR uses < max_uses)
              AND (expires_at IS NULL OR unixepoch(expires_at) > unixepoch('now'))
            ORDER BY discount_price ASC, id ASC
        "#,
    )
    .bind(product_id)
    .fetch_all(conn)
    .await
}

pub async fn discounts_for_merchant(
    merchant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<MerchantDiscount>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM merchant_discounts WHERE merchant_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(merchant_id)
        .fetch_all(conn)
        .await
}

/// Takes one use of the discount, flipping it to `exhausted` when the last use is taken. Returns `None` when the
/// discount is not usable.
pub async fn claim_use(id: i64, conn: &mut SqliteConnection) -> Result<Option<MerchantDiscount>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE merchant_discounts SET
                uses = uses + 1,
                status = CASE WHEN max_uses IS NOT NULL AND uses + 1 >= max_uses THEN 'exhausted' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
              AND status = 'active'
              AND (max_uses IS NULL OR uses < max_uses)
              AND (expires_at IS NULL OR unixepoch(expires_at) > unixepoch('now'))
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn release_use(id: i64, conn: &mut SqliteConnection) -> Result<Option<MerchantDiscount>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE merchant_discounts SET
                uses = MAX(uses - 1, 0),
                status = CASE WHEN status = 'exhausted' THEN 'active' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn expire_lapsed(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE merchant_discounts SET status = 'expired', updated_at = CURRENT_TIMESTAMP
            WHERE status = 'active' AND expires_at IS NOT NULL AND unixepoch(expires_at) <= unixepoch('now')
        "#,
    )
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
