//! Storefront catalog sync.
//!
//! Products imported from a storefront are keyed on their platform id. A price that differs from the stored current
//! price is run through the buy order flow, so that a price drop on the storefront fulfills buy orders exactly as a
//! manual price change would.
use bo_common::Secret;
use buy_order_engine::{
    db_types::{Integration, NewProduct, Platform, PriceChangeSource, ProductSource},
    traits::{BuyOrderDatabase, PaymentProcessor},
    BuyOrderFlowApi,
    CatalogApi,
};
use log::*;
use storefront_tools::{
    CatalogItem,
    ShopifyApi,
    ShopifyConfig,
    StorefrontApiError,
    Webhook,
    WooCommerceApi,
    WooCommerceConfig,
};

use crate::{data_objects::SyncReport, errors::ServerError};

pub const PRODUCT_UPDATE_TOPIC: &str = "products/update";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Created,
    /// The price changed, and this many buy orders were fulfilled as a result.
    Repriced(usize),
    Unchanged,
}

pub async fn fetch_catalog(integration: &Integration) -> Result<Vec<CatalogItem>, StorefrontApiError> {
    let token = Secret::new(integration.access_token.clone());
    match integration.platform {
        Platform::Shopify => {
            let api = ShopifyApi::new(ShopifyConfig::new(&integration.shop_domain, token))?;
            api.fetch_catalog().await
        },
        Platform::Woocommerce => {
            let secret = Secret::new(integration.api_secret.clone().unwrap_or_default());
            let config = WooCommerceConfig::new(&integration.shop_domain, &integration.access_token, secret);
            WooCommerceApi::new(config)?.fetch_catalog().await
        },
    }
}

/// Registers the product update webhook on a Shopify shop. Other platforms are synced on demand only.
pub async fn install_product_webhook(
    integration: &Integration,
    address: &str,
) -> Result<Option<Webhook>, StorefrontApiError> {
    if integration.platform != Platform::Shopify {
        return Ok(None);
    }
    let token = Secret::new(integration.access_token.clone());
    let api = ShopifyApi::new(ShopifyConfig::new(&integration.shop_domain, token))?;
    let webhook = api.ensure_webhook(address, PRODUCT_UPDATE_TOPIC).await?;
    info!("🔌️ Product webhook #{} is installed on {}", webhook.id, integration.shop_domain);
    Ok(Some(webhook))
}

/// Brings one storefront product into the catalog, creating it if it is new, and processes any price change.
pub async fn apply_catalog_item<B, P>(
    integration: &Integration,
    item: &CatalogItem,
    source: PriceChangeSource,
    api: &BuyOrderFlowApi<B, P>,
) -> Result<ItemOutcome, ServerError>
where
    B: BuyOrderDatabase,
    P: PaymentProcessor,
{
    let catalog = CatalogApi::new(api.db().clone());
    let product = NewProduct::new(integration.merchant_id, item.title.as_str(), item.price)
        .with_source(ProductSource::from(integration.platform), item.source_id.as_str());
    let upsert = catalog.upsert_product(product).await?;
    if upsert.created {
        debug!("🔌️ Imported '{}' from {} at {}", item.title, integration.shop_domain, item.price);
        return Ok(ItemOutcome::Created);
    }
    match upsert.pending_price {
        Some(price) => {
            let report = api.process_price_change(upsert.product.id, price, source).await?;
            Ok(ItemOutcome::Repriced(report.fulfilled.len()))
        },
        None => Ok(ItemOutcome::Unchanged),
    }
}

/// Applies every item in turn. A failing item is recorded in the report and does not stop the rest.
pub async fn apply_catalog<B, P>(
    integration: &Integration,
    items: &[CatalogItem],
    source: PriceChangeSource,
    api: &BuyOrderFlowApi<B, P>,
) -> SyncReport
where
    B: BuyOrderDatabase,
    P: PaymentProcessor,
{
    let mut report = SyncReport { integration_id: integration.id, ..Default::default() };
    for item in items {
        match apply_catalog_item(integration, item, source, api).await {
            Ok(ItemOutcome::Created) => report.created += 1,
            Ok(ItemOutcome::Repriced(n)) => {
                report.updated += 1;
                report.fulfilled_orders += n;
            },
            Ok(ItemOutcome::Unchanged) => report.unchanged += 1,
            Err(e) => {
                warn!("🔌️ Could not sync product {} from {}. {e}", item.source_id, integration.shop_domain);
                report.errors.push(format!("{}: {e}", item.source_id));
            },
        }
    }
    report
}

pub async fn sync_storefront<B, P>(
    integration: &Integration,
    api: &BuyOrderFlowApi<B, P>,
) -> Result<SyncReport, ServerError>
where
    B: BuyOrderDatabase,
    P: PaymentProcessor,
{
    info!("🔌️ Syncing the catalog of {} ({})", integration.shop_domain, integration.platform);
    let items = fetch_catalog(integration).await?;
    let report = apply_catalog(integration, &items, PriceChangeSource::Sync, api).await;
    info!(
        "🔌️ Sync of {} complete. {} created, {} repriced, {} unchanged, {} buy orders fulfilled, {} errors",
        integration.shop_domain,
        report.created,
        report.updated,
        report.unchanged,
        report.fulfilled_orders,
        report.errors.len()
    );
    Ok(report)
}
