use bo_common::Cents;
use serde::{Deserialize, Serialize};

use crate::{helpers::parse_storefront_price, ShopifyProduct, StorefrontApiError, WooProduct};

/// A platform-neutral view of a storefront product: its id on the platform, its title and its current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub source_id: String,
    pub title: String,
    pub price: Cents,
}

impl TryFrom<&ShopifyProduct> for CatalogItem {
    type Error = StorefrontApiError;

    fn try_from(p: &ShopifyProduct) -> Result<Self, Self::Error> {
        Ok(Self { source_id: p.id.to_string(), title: p.title.clone(), price: p.listed_price()? })
    }
}

impl TryFrom<&WooProduct> for CatalogItem {
    type Error = StorefrontApiError;

    fn try_from(p: &WooProduct) -> Result<Self, Self::Error> {
        // WooCommerce reports an empty `price` for products that are not purchasable yet
        let raw = if p.price.is_empty() { p.regular_price.as_str() } else { p.price.as_str() };
        let price = parse_storefront_price(raw)?;
        Ok(Self { source_id: p.id.to_string(), title: p.name.clone(), price })
    }
}
