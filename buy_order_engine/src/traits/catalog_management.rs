use thiserror::Error;

use crate::{
    db_types::{NewProduct, PriceHistory, Product, ProductSource},
    traits::ProductUpsert,
};

#[derive(Debug, Clone, Error)]
pub enum CatalogApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
    #[error("Product {0} belongs to another merchant")]
    NotProductOwner(i64),
}

impl From<sqlx::Error> for CatalogApiError {
    fn from(e: sqlx::Error) -> Self {
        CatalogApiError::DatabaseError(e.to_string())
    }
}

/// Maintains the merchant product catalog.
///
/// Price *changes* on existing products do not go through this trait, since they have to trigger buy order
/// fulfillment. See [`crate::traits::BuyOrderDatabase::update_product_price`].
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Inserts the product, or updates the title and list price of an existing product with the same
    /// `(merchant_id, source, source_id)`. The current price of an existing product is never modified here; if it
    /// differs from the incoming price, [`ProductUpsert::pending_price`] is set so the caller can route the change
    /// through the price change flow.
    async fn upsert_product(&self, product: NewProduct) -> Result<ProductUpsert, CatalogApiError>;

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogApiError>;

    async fn find_product_by_source(
        &self,
        merchant_id: i64,
        source: ProductSource,
        source_id: &str,
    ) -> Result<Option<Product>, CatalogApiError>;

    async fn products_for_merchant(&self, merchant_id: i64) -> Result<Vec<Product>, CatalogApiError>;

    /// Price history for the product, most recent first.
    async fn price_history(&self, product_id: i64) -> Result<Vec<PriceHistory>, CatalogApiError>;
}
