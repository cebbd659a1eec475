use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{config::WooCommerceConfig, CatalogItem, StorefrontApiError};

const PRODUCT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WooProduct {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub permalink: Option<String>,
}

impl WooProduct {
    pub fn is_published(&self) -> bool {
        self.status.as_deref().map(|s| s == "publish").unwrap_or(true)
    }
}

/// Read-only client for the WooCommerce REST API (v3), authenticated with a consumer key and secret.
#[derive(Clone)]
pub struct WooCommerceApi {
    config: WooCommerceConfig,
    client: Arc<Client>,
}

impl WooCommerceApi {
    pub fn new(config: WooCommerceConfig) -> Result<Self, StorefrontApiError> {
        let client = Client::builder().build().map_err(|e| StorefrontApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/wp-json/wc/v3{path}", self.config.site_url)
    }

    pub async fn fetch_products_page(&self, page: usize) -> Result<Vec<WooProduct>, StorefrontApiError> {
        let url = self.url("/products");
        trace!("🛍️ Fetching WooCommerce products page {page}: {url}");
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.consumer_key, Some(self.config.consumer_secret.reveal()))
            .query(&[("page", page.to_string()), ("per_page", PRODUCT_PAGE_SIZE.to_string())])
            .send()
            .await
            .map_err(|e| StorefrontApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            response.json::<Vec<WooProduct>>().await.map_err(|e| StorefrontApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StorefrontApiError::RestResponseError(e.to_string()))?;
            Err(StorefrontApiError::QueryError { status, message })
        }
    }

    pub async fn fetch_all_products(&self) -> Result<Vec<WooProduct>, StorefrontApiError> {
        let mut products = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.fetch_products_page(page).await?;
            let count = batch.len();
            products.extend(batch);
            if count < PRODUCT_PAGE_SIZE {
                break;
            }
            page += 1;
        }
        info!("🛍️ Fetched {} products from {}", products.len(), self.config.site_url);
        Ok(products)
    }

    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>, StorefrontApiError> {
        let products = self.fetch_all_products().await?;
        let items = products
            .iter()
            .filter(|p| p.is_published())
            .filter_map(|p| match CatalogItem::try_from(p) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("🛍️ Skipping WooCommerce product {} ({}). {e}", p.id, p.name);
                    None
                },
            })
            .collect();
        Ok(items)
    }
}
