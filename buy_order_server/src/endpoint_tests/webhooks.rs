use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bo_common::{Cents, Secret};
use buy_order_engine::{
    db_types::{NewIntegration, NewProduct, Platform, ProductSource},
    events::EventProducers,
    order_objects::NewBuyOrderRequest,
    test_utils::mock_processor::MockProcessor,
    traits::CatalogManagement,
    AccountApi,
    BuyOrderError,
    BuyOrderFlowApi,
    IntegrationApi,
    SqliteDatabase,
};
use chrono::Utc;
use serde_json::json;
use stripe_tools::{
    webhook::{sign_payload, SIGNATURE_HEADER},
    StripeConfig,
};

use super::helpers::{call_public, json};
use crate::{
    config::ServerConfig,
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
    shopify_routes::{ShopifyProductUpdateRoute, SHOPIFY_HMAC_HEADER, SHOP_DOMAIN_HEADER},
    stripe_routes::StripeWebhookRoute,
    test_helpers::{register_customer, register_merchant, test_database},
};

const WEBHOOK_SECRET: &str = "whsec_test_secret";
const SHOPIFY_SECRET: &str = "shopify-app-secret";
const SHOP: &str = "widgets.myshopify.com";

type FlowApi = BuyOrderFlowApi<SqliteDatabase, MockProcessor>;

/// A merchant with one product at $100 and a customer waiting for it to drop to $80.
async fn setup() -> (FlowApi, i64, i64) {
    let db = test_database().await;
    let accounts = AccountApi::new(db.clone());
    let merchant = register_merchant(&accounts, "shop@example.com").await;
    let customer = register_customer(&accounts, "alice@example.com").await;
    let product = NewProduct::new(merchant, "Espresso machine", Cents::from(10_000))
        .with_source(ProductSource::Shopify, "632910392");
    let product = db.upsert_product(product).await.expect("Error adding product").product;
    let api = BuyOrderFlowApi::new(db, MockProcessor::new(), EventProducers::default());
    let request = NewBuyOrderRequest {
        product_id: product.id,
        target_price: Cents::from(8_000),
        payment_method: "pm_card_visa".into(),
        expires_in_days: None,
    };
    let placed = api.create_buy_order(customer, request).await.expect("Could not place buy order");
    (api, merchant, placed.order.id)
}

fn configure_stripe(api: FlowApi) -> impl FnOnce(&mut ServiceConfig) {
    let mut config = ServerConfig::default();
    config.stripe = StripeConfig::new("sk_test_key", WEBHOOK_SECRET);
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(config))
            .service(StripeWebhookRoute::<SqliteDatabase, MockProcessor>::new());
    }
}

fn intent_event(event_type: &str, intent_id: &str, status: &str) -> Vec<u8> {
    json!({
        "id": "evt_1NG8Du2eZvKYlo2CUI79vXWy",
        "type": event_type,
        "created": Utc::now().timestamp(),
        "data": { "object": {
            "object": "payment_intent",
            "id": intent_id,
            "amount": 8_000,
            "currency": "usd",
            "status": status,
            "application_fee_amount": 200
        }}
    })
    .to_string()
    .into_bytes()
}

#[actix_web::test]
async fn stripe_cancellation_expires_the_order() {
    let _ = env_logger::try_init().ok();
    let (api, _, order_id) = setup().await;
    let escrow = api.escrow_for_order(order_id).await.unwrap().expect("escrow payment");
    let payload = intent_event("payment_intent.canceled", &escrow.payment_intent_id, "canceled");
    let signature = sign_payload(&payload, WEBHOOK_SECRET, Utc::now().timestamp()).unwrap();
    let req = TestRequest::post()
        .uri("/stripe/webhook")
        .insert_header((SIGNATURE_HEADER, signature))
        .set_payload(payload);
    let (status, body) = call_public(configure_stripe(api.clone()), req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["success"], true);

    let order = api.fetch_buy_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status.to_string(), "expired");
    let escrow = api.escrow_for_order(order_id).await.unwrap().unwrap();
    assert_eq!(escrow.status.to_string(), "refunded");
}

#[actix_web::test]
async fn stripe_events_must_be_signed() {
    let _ = env_logger::try_init().ok();
    let (api, _, order_id) = setup().await;
    let payload = intent_event("payment_intent.canceled", "pi_mock_1", "canceled");

    let req = TestRequest::post().uri("/stripe/webhook").set_payload(payload.clone());
    let (status, _) = call_public(configure_stripe(api.clone()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = sign_payload(&payload, "whsec_someone_else", Utc::now().timestamp()).unwrap();
    let req = TestRequest::post().uri("/stripe/webhook").insert_header((SIGNATURE_HEADER, forged)).set_payload(payload);
    let (status, _) = call_public(configure_stripe(api.clone()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let order = api.fetch_buy_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status.to_string(), "monitoring");
}

#[actix_web::test]
async fn unknown_stripe_events_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let (api, _, _) = setup().await;
    let payload = json!({ "id": "evt_2", "type": "customer.created", "data": { "object": { "object": "customer" } } })
        .to_string()
        .into_bytes();
    let signature = sign_payload(&payload, WEBHOOK_SECRET, Utc::now().timestamp()).unwrap();
    let req =
        TestRequest::post().uri("/stripe/webhook").insert_header((SIGNATURE_HEADER, signature)).set_payload(payload);
    let (status, body) = call_public(configure_stripe(api), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["message"], "Event ignored");
}

fn account_event(account_id: &str, charges_enabled: bool) -> Vec<u8> {
    json!({
        "id": "evt_1NG8Du2eZvKYlo2CAcct0001",
        "type": "account.updated",
        "created": Utc::now().timestamp(),
        "data": { "object": {
            "object": "account",
            "id": account_id,
            "email": "shop@example.com",
            "charges_enabled": charges_enabled,
            "payouts_enabled": charges_enabled,
            "details_submitted": true
        }}
    })
    .to_string()
    .into_bytes()
}

async fn send_account_update(api: &FlowApi, account_id: &str, charges_enabled: bool) {
    let payload = account_event(account_id, charges_enabled);
    let signature = sign_payload(&payload, WEBHOOK_SECRET, Utc::now().timestamp()).unwrap();
    let req =
        TestRequest::post().uri("/stripe/webhook").insert_header((SIGNATURE_HEADER, signature)).set_payload(payload);
    let (status, body) = call_public(configure_stripe(api.clone()), req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["message"], "Account update recorded");
}

#[actix_web::test]
async fn account_updates_control_whether_merchants_take_orders() {
    let _ = env_logger::try_init().ok();
    let (api, merchant_id, order_id) = setup().await;
    let order = api.fetch_buy_order(order_id).await.unwrap().unwrap();
    let accounts = AccountApi::new(api.db().clone());
    let account_id = format!("acct_{merchant_id}");
    let request = || NewBuyOrderRequest {
        product_id: order.product_id,
        target_price: Cents::from(7_000),
        payment_method: "pm_card_visa".into(),
        expires_in_days: None,
    };

    send_account_update(&api, &account_id, false).await;
    let merchant = accounts.fetch_merchant(merchant_id).await.unwrap().unwrap();
    assert!(!merchant.charges_enabled);
    let err = api.create_buy_order(order.customer_id, request()).await.unwrap_err();
    assert!(matches!(err, BuyOrderError::MerchantPaymentsNotEnabled(id) if id == merchant_id));

    send_account_update(&api, &account_id, true).await;
    let merchant = accounts.fetch_merchant(merchant_id).await.unwrap().unwrap();
    assert!(merchant.charges_enabled);
    let placed = api.create_buy_order(order.customer_id, request()).await.unwrap();
    assert_eq!(placed.order.status.to_string(), "monitoring");
}

fn configure_shopify(api: FlowApi) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let hmac = HmacMiddlewareFactory::new(SHOPIFY_HMAC_HEADER, Secret::new(SHOPIFY_SECRET.to_string()), true);
        cfg.app_data(web::Data::new(IntegrationApi::new(api.db().clone())))
            .app_data(web::Data::new(api))
            .service(
                web::scope("/shopify")
                    .wrap(hmac)
                    .service(ShopifyProductUpdateRoute::<SqliteDatabase, SqliteDatabase, MockProcessor>::new()),
            );
    }
}

fn product_update(price: &str) -> Vec<u8> {
    json!({
        "id": 632910392,
        "title": "Espresso machine",
        "status": "active",
        "variants": [{ "id": 808950810, "price": price, "position": 1 }]
    })
    .to_string()
    .into_bytes()
}

async fn connect_shop(api: &FlowApi, merchant: i64) {
    IntegrationApi::new(api.db().clone())
        .connect(merchant, NewIntegration {
            platform: Platform::Shopify,
            shop_domain: SHOP.into(),
            access_token: "shpat_x".into(),
            api_secret: None,
        })
        .await
        .expect("Could not connect integration");
}

#[actix_web::test]
async fn shopify_price_drop_fulfills_orders() {
    let _ = env_logger::try_init().ok();
    let (api, merchant, order_id) = setup().await;
    connect_shop(&api, merchant).await;
    let payload = product_update("79.00");
    let req = TestRequest::post()
        .uri("/shopify/webhook/product_update")
        .insert_header((SHOP_DOMAIN_HEADER, SHOP))
        .insert_header((SHOPIFY_HMAC_HEADER, calculate_hmac(SHOPIFY_SECRET, &payload)))
        .set_payload(payload);
    let (status, body) = call_public(configure_shopify(api.clone()), req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let body = json(&body);
    assert_eq!(body["success"], true, "{body}");
    assert_eq!(body["message"], "Product 632910392 repriced to $79.00. 1 buy orders fulfilled");

    let order = api.fetch_buy_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status.to_string(), "fulfilled");
    assert_eq!(order.fulfilled_price, Some(Cents::from(7_900)));
    assert_eq!(api.processor().captures().len(), 1);
}

#[actix_web::test]
async fn shopify_updates_from_unknown_shops_change_nothing() {
    let _ = env_logger::try_init().ok();
    let (api, _, order_id) = setup().await;
    let payload = product_update("50.00");
    let req = TestRequest::post()
        .uri("/shopify/webhook/product_update")
        .insert_header((SHOP_DOMAIN_HEADER, SHOP))
        .insert_header((SHOPIFY_HMAC_HEADER, calculate_hmac(SHOPIFY_SECRET, &payload)))
        .set_payload(payload);
    let (status, body) = call_public(configure_shopify(api.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["success"], false);
    let order = api.fetch_buy_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status.to_string(), "monitoring");
}

#[actix_web::test]
async fn shopify_webhooks_need_a_valid_hmac() {
    let _ = env_logger::try_init().ok();
    let (api, merchant, order_id) = setup().await;
    connect_shop(&api, merchant).await;
    let payload = product_update("50.00");
    let req = TestRequest::post()
        .uri("/shopify/webhook/product_update")
        .insert_header((SHOP_DOMAIN_HEADER, SHOP))
        .insert_header((SHOPIFY_HMAC_HEADER, calculate_hmac("not-the-secret", &payload)))
        .set_payload(payload.clone());
    let (status, _) = call_public(configure_shopify(api.clone()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::post()
        .uri("/shopify/webhook/product_update")
        .insert_header((SHOP_DOMAIN_HEADER, SHOP))
        .set_payload(payload);
    let (status, _) = call_public(configure_shopify(api.clone()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(api.processor().captures().is_empty());
    let order = api.fetch_buy_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status.to_string(), "monitoring");
}
