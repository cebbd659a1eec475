//----------------------------------------------   Product updates  ----------------------------------------------------
//
// Shopify retries any webhook that is not answered with a 2xx status, so once the HMAC check has passed these handlers
// always answer 200 and report problems in the JSON body.
use actix_web::{web, HttpRequest, HttpResponse};
use buy_order_engine::{
    db_types::{Platform, PriceChangeSource},
    traits::{BuyOrderDatabase, IntegrationManagement, PaymentProcessor},
    BuyOrderFlowApi,
    IntegrationApi,
};
use log::*;
use storefront_tools::{CatalogItem, ShopifyProduct};

use crate::{
    data_objects::JsonResponse,
    helpers::header_str,
    integrations::storefront::{apply_catalog_item, ItemOutcome},
    route,
};

pub const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";
pub const SHOPIFY_HMAC_HEADER: &str = "X-Shopify-Hmac-SHA256";

route!(shopify_product_update => Post "/webhook/product_update" impl IntegrationManagement, BuyOrderDatabase, PaymentProcessor);
pub async fn shopify_product_update<I, B, P>(
    req: HttpRequest,
    body: web::Bytes,
    integrations: web::Data<IntegrationApi<I>>,
    api: web::Data<BuyOrderFlowApi<B, P>>,
) -> HttpResponse
where
    I: IntegrationManagement,
    B: BuyOrderDatabase,
    P: PaymentProcessor,
{
    trace!("🛍️ Received product update webhook: {}", req.uri());
    let result = match handle_product_update(&req, &body, integrations.as_ref(), api.as_ref()).await {
        Ok(message) => JsonResponse::success(message),
        Err(message) => {
            warn!("🛍️ Product update was not applied. {message}");
            JsonResponse::failure(message)
        },
    };
    HttpResponse::Ok().json(result)
}

async fn handle_product_update<I, B, P>(
    req: &HttpRequest,
    body: &[u8],
    integrations: &IntegrationApi<I>,
    api: &BuyOrderFlowApi<B, P>,
) -> Result<String, String>
where
    I: IntegrationManagement,
    B: BuyOrderDatabase,
    P: PaymentProcessor,
{
    let shop = header_str(req, SHOP_DOMAIN_HEADER).ok_or_else(|| format!("Missing {SHOP_DOMAIN_HEADER} header"))?;
    let product = serde_json::from_slice::<ShopifyProduct>(body).map_err(|e| format!("Invalid product payload. {e}"))?;
    debug!("🛍️ Product update from {shop} for '{}' ({})", product.title, product.id);
    let integration = integrations
        .integration_for_shop(Platform::Shopify, shop)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("No Shopify integration is connected for {shop}"))?;
    if !product.is_active() {
        return Ok(format!("Product {} is not active. Ignored.", product.id));
    }
    let item = CatalogItem::try_from(&product).map_err(|e| e.to_string())?;
    let outcome = apply_catalog_item(&integration, &item, PriceChangeSource::Webhook, api)
        .await
        .map_err(|e| e.to_string())?;
    let message = match outcome {
        ItemOutcome::Created => format!("Product {} imported at {}", item.source_id, item.price),
        ItemOutcome::Repriced(n) => {
            info!("🛍️ Product {} on {shop} is now {}. {n} buy orders fulfilled", item.source_id, item.price);
            format!("Product {} repriced to {}. {n} buy orders fulfilled", item.source_id, item.price)
        },
        ItemOutcome::Unchanged => format!("Product {} unchanged", item.source_id),
    };
    Ok(message)
}
