use bo_common::Cents;
use serde::{Deserialize, Serialize};

use crate::{helpers::parse_storefront_price, StorefrontApiError};

/// A Shopify product, as returned by the Admin REST API and delivered by the `products/update` webhook.
///
/// Only the fields needed for price tracking are mandatory. Everything else is optional so that payload changes on
/// Shopify's side do not break webhook ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyProduct {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: i64,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    pub price: String,
    #[serde(default)]
    pub compare_at_price: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
}

impl ShopifyProduct {
    /// The price buy orders are measured against: the price of the product's default (first) variant.
    pub fn listed_price(&self) -> Result<Cents, StorefrontApiError> {
        let variant = self
            .variants
            .iter()
            .min_by_key(|v| v.position.unwrap_or(i64::MAX))
            .ok_or(StorefrontApiError::NoVariants(self.id))?;
        parse_storefront_price(&variant.price)
    }

    pub fn is_active(&self) -> bool {
        self.status.as_deref().map(|s| s == "active").unwrap_or(true)
    }
}
