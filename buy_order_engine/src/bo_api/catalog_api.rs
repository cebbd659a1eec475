use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, PriceHistory, Product, ProductSource},
    traits::{CatalogApiError, CatalogManagement, ProductUpsert},
};

/// The `CatalogApi` maintains the merchants' product catalogs.
///
/// Price changes of existing products must go through
/// [`crate::BuyOrderFlowApi::process_price_change`] so that waiting buy orders are fulfilled.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B: Clone> Clone for CatalogApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Adds the product to the catalog, or refreshes an imported product that is already there.
    ///
    /// If an existing product's current price differs from `product.price`, the new price is returned in
    /// [`ProductUpsert::pending_price`] for the caller to apply with the price change flow.
    pub async fn upsert_product(&self, mut product: NewProduct) -> Result<ProductUpsert, CatalogApiError> {
        product.title = product.title.trim().to_string();
        if product.title.is_empty() {
            return Err(CatalogApiError::InvalidProduct("A product title is required".into()));
        }
        if !product.price.is_positive() {
            return Err(CatalogApiError::InvalidPrice(format!("{} is not a valid product price", product.price)));
        }
        if product.source != ProductSource::Manual && product.source_id.as_deref().map_or(true, str::is_empty) {
            return Err(CatalogApiError::InvalidProduct(format!("Products imported from {} need a source id", product.source)));
        }
        let result = self.db.upsert_product(product).await?;
        if result.created {
            info!("🛒️ Product #{} '{}' added to merchant #{}", result.product.id, result.product.title, result.product.merchant_id);
        } else if let Some(price) = result.pending_price {
            debug!("🛒️ Product #{} is now listed at {price}. The price change is pending", result.product.id);
        }
        Ok(result)
    }

    pub async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogApiError> {
        self.db.fetch_product(id).await
    }

    /// Fetches the product, checking that it belongs to `merchant_id`.
    pub async fn fetch_product_for_merchant(&self, merchant_id: i64, id: i64) -> Result<Product, CatalogApiError> {
        let product = self.db.fetch_product(id).await?.ok_or(CatalogApiError::ProductNotFound(id))?;
        if product.merchant_id != merchant_id {
            return Err(CatalogApiError::NotProductOwner(id));
        }
        Ok(product)
    }

    pub async fn find_product_by_source(
        &self,
        merchant_id: i64,
        source: ProductSource,
        source_id: &str,
    ) -> Result<Option<Product>, CatalogApiError> {
        self.db.find_product_by_source(merchant_id, source, source_id).await
    }

    pub async fn products_for_merchant(&self, merchant_id: i64) -> Result<Vec<Product>, CatalogApiError> {
        self.db.products_for_merchant(merchant_id).await
    }

    pub async fn price_history(&self, product_id: i64) -> Result<Vec<PriceHistory>, CatalogApiError> {
        self.db.price_history(product_id).await
    }
}
