use bo_common::Cents;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewProduct, PriceChangeSource, PriceHistory, Product, ProductSource};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (merchant_id, title, price, current_price, source, source_id)
            VALUES ($1, $2, $3, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(product.merchant_id)
    .bind(product.title)
    .bind(product.price)
    .bind(product.source)
    .bind(product.source_id)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product #{} ({}) inserted at {}", product.id, product.title, product.current_price);
    Ok(product)
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn find_by_source(
    merchant_id: i64,
    source: ProductSource,
    source_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE merchant_id = $1 AND source = $2 AND source_id = $3")
        .bind(merchant_id)
        .bind(source)
        .bind(source_id)
        .fetch_optional(conn)
        .await
}

pub async fn products_for_merchant(merchant_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE merchant_id = $1 ORDER BY id").bind(merchant_id).fetch_all(conn).await
}

/// Updates the descriptive fields of an imported product. The current price is left alone.
pub async fn update_details(
    id: i64,
    title: &str,
    list_price: Cents,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE products SET title = $1, price = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(title)
    .bind(list_price)
    .bind(id)
    .fetch_one(conn)
    .await
}

pub async fn set_current_price(
    id: i64,
    price: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE products SET current_price = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(price)
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn insert_price_history(
    product_id: i64,
    old_price: Cents,
    new_price: Cents,
    source: PriceChangeSource,
    conn: &mut SqliteConnection,
) -> Result<PriceHistory, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO price_history (product_id, old_price, new_price, source) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(product_id)
    .bind(old_price)
    .bind(new_price)
    .bind(source)
    .fetch_one(conn)
    .await
}

pub async fn price_history(product_id: i64, conn: &mut SqliteConnection) -> Result<Vec<PriceHistory>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM price_history WHERE product_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(product_id)
        .fetch_all(conn)
        .await
}
