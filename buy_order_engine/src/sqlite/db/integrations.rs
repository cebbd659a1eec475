use sqlx::SqliteConnection;

use crate::db_types::{Integration, NewIntegration, Platform};

/// Inserts the integration, or refreshes the credentials if the same merchant already connected this shop. Returns
/// `None` if the shop is connected to a different merchant.
pub async fn upsert_integration(
    merchant_id: i64,
    integration: NewIntegration,
    conn: &mut SqliteConnection,
) -> Result<Option<Integration>, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO integrations (merchant_id, platform, shop_domain, access_token, api_secret)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (platform, shop_domain) DO UPDATE SET
                access_token = excluded.access_token,
                api_secret = excluded.api_secret,
                status = 'connected',
                updated_at = CURRENT_TIMESTAMP
            WHERE integrations.merchant_id = excluded.merchant_id
            RETURNING *;
        "#,
    )
    .bind(merchant_id)
    .bind(integration.platform)
    .bind(integration.shop_domain.to_lowercase())
    .bind(integration.access_token)
    .bind(integration.api_secret)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_integration(id: i64, conn: &mut SqliteConnection) -> Result<Option<Integration>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM integrations WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn integrations_for_merchant(
    merchant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Integration>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM integrations WHERE merchant_id = $1 ORDER BY id").bind(merchant_id).fetch_all(conn).await
}

pub async fn connected_for_shop(
    platform: Platform,
    shop_domain: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Integration>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM integrations WHERE platform = $1 AND shop_domain = $2 AND status = 'connected'")
        .bind(platform)
        .bind(shop_domain.to_lowercase())
        .fetch_optional(conn)
        .await
}

pub async fn disconnect(
    merchant_id: i64,
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Integration>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE integrations SET status = 'disconnected', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND merchant_id = $2
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(merchant_id)
    .fetch_optional(conn)
    .await
}

pub async fn mark_synced(id: i64, conn: &mut SqliteConnection) -> Result<Option<Integration>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE integrations SET last_synced_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}
