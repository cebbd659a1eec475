use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bo_common::Cents;
use buy_order_engine::{
    db_types::{NewProduct, Role},
    events::EventProducers,
    test_utils::mock_processor::{Fault, MockProcessor},
    traits::{CatalogManagement, ProcessorError},
    AccountApi,
    BuyOrderFlowApi,
    CatalogApi,
    SqliteDatabase,
};
use serde_json::json;

use super::helpers::{bearer, call_api, json, token_for};
use crate::{
    routes::{
        BuyOrderByIdRoute,
        CancelBuyOrderRoute,
        CreateBuyOrderRoute,
        CreateProductRoute,
        IssueDiscountRoute,
        MerchantBuyOrdersRoute,
        MyBuyOrdersRoute,
        UpdateProductPriceRoute,
    },
    test_helpers::{register_customer, register_merchant, test_database},
};

type FlowApi = BuyOrderFlowApi<SqliteDatabase, MockProcessor>;

struct Shop {
    api: FlowApi,
    processor: MockProcessor,
    merchant: i64,
    alice: i64,
    bob: i64,
    product: i64,
}

impl Shop {
    async fn new() -> Self {
        let db = test_database().await;
        let accounts = AccountApi::new(db.clone());
        let merchant = register_merchant(&accounts, "shop@example.com").await;
        let alice = register_customer(&accounts, "alice@example.com").await;
        let bob = register_customer(&accounts, "bob@example.com").await;
        let product = db
            .upsert_product(NewProduct::new(merchant, "Espresso machine", Cents::from(10_000)))
            .await
            .expect("Error adding product")
            .product
            .id;
        let processor = MockProcessor::new();
        let api = BuyOrderFlowApi::new(db, processor.clone(), EventProducers::default());
        Self { api, processor, merchant, alice, bob, product }
    }

    fn configure(&self) -> impl FnOnce(&mut ServiceConfig) {
        let api = self.api.clone();
        move |cfg: &mut ServiceConfig| {
            cfg.app_data(web::Data::new(CatalogApi::new(api.db().clone())))
                .app_data(web::Data::new(api))
                .service(CreateBuyOrderRoute::<SqliteDatabase, MockProcessor>::new())
                .service(MyBuyOrdersRoute::<SqliteDatabase, MockProcessor>::new())
                .service(BuyOrderByIdRoute::<SqliteDatabase, MockProcessor>::new())
                .service(CancelBuyOrderRoute::<SqliteDatabase, MockProcessor>::new())
                .service(MerchantBuyOrdersRoute::<SqliteDatabase, MockProcessor>::new())
                .service(CreateProductRoute::<SqliteDatabase>::new())
                .service(UpdateProductPriceRoute::<SqliteDatabase, MockProcessor>::new())
                .service(IssueDiscountRoute::<SqliteDatabase, MockProcessor>::new());
        }
    }

    fn customer_token(&self, id: i64) -> String {
        let email = if id == self.alice { "alice@example.com" } else { "bob@example.com" };
        token_for(id, Role::Customer, email)
    }

    fn merchant_token(&self) -> String {
        token_for(self.merchant, Role::Merchant, "shop@example.com")
    }

    async fn place(&self, customer: i64, target: i64) -> (StatusCode, serde_json::Value) {
        let req = TestRequest::post()
            .uri("/buy_orders")
            .insert_header(bearer(&self.customer_token(customer)))
            .set_json(json!({ "product_id": self.product, "target_price": target, "payment_method": "pm_card_visa" }));
        let (status, body) = call_api(self.configure(), req).await;
        let value = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
        (status, value)
    }
}

#[actix_web::test]
async fn price_drop_fulfills_a_placed_order() {
    let _ = env_logger::try_init().ok();
    let shop = Shop::new().await;
    let (status, placed) = shop.place(shop.alice, 8_000).await;
    assert_eq!(status, StatusCode::CREATED, "{placed}");
    assert_eq!(placed["order"]["status"], "monitoring");
    assert_eq!(placed["escrow"]["status"], "held");
    assert_eq!(placed["escrow"]["escrow_amount"], 8_000);
    let order_id = placed["order"]["id"].as_i64().unwrap();
    assert_eq!(shop.processor.holds().len(), 1);

    let req = TestRequest::post()
        .uri(&format!("/products/{}/price", shop.product))
        .insert_header(bearer(&shop.merchant_token()))
        .set_json(json!({ "price": 7_500 }));
    let (status, body) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let report = json(&body);
    assert_eq!(report["fulfilled"].as_array().unwrap().len(), 1);
    assert_eq!(report["fulfilled"][0]["fulfilled_price"], 7_500);
    assert_eq!(shop.processor.captures().len(), 1);

    let req = TestRequest::get().uri(&format!("/buy_orders/{order_id}")).insert_header(bearer(&shop.customer_token(shop.alice)));
    let (status, body) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let detail = json(&body);
    assert_eq!(detail["order"]["status"], "fulfilled");
    assert_eq!(detail["escrow"]["status"], "released");
    assert_eq!(detail["escrow"]["captured_amount"], 7_500);
    assert!(detail["ledger"].as_array().unwrap().len() >= 2);
}

#[actix_web::test]
async fn declined_holds_leave_no_order_behind() {
    let _ = env_logger::try_init().ok();
    let shop = Shop::new().await;
    shop.processor.fail_next_hold(Fault::Reject(ProcessorError::Declined("insufficient funds".into())));
    let (status, body) = shop.place(shop.alice, 8_000).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "Payment authorization failed");

    let req = TestRequest::get().uri("/buy_orders").insert_header(bearer(&shop.customer_token(shop.alice)));
    let (status, body) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!([]));
}

#[actix_web::test]
async fn targets_must_be_below_the_current_price() {
    let _ = env_logger::try_init().ok();
    let shop = Shop::new().await;
    let (status, _) = shop.place(shop.alice, 10_000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(shop.processor.holds().is_empty());
}

#[actix_web::test]
async fn orders_are_private_to_their_owner() {
    let _ = env_logger::try_init().ok();
    let shop = Shop::new().await;
    let (_, placed) = shop.place(shop.alice, 8_000).await;
    let order_id = placed["order"]["id"].as_i64().unwrap();

    let req = TestRequest::get().uri(&format!("/buy_orders/{order_id}")).insert_header(bearer(&shop.customer_token(shop.bob)));
    let (status, _) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::post()
        .uri(&format!("/buy_orders/{order_id}/cancel"))
        .insert_header(bearer(&shop.customer_token(shop.bob)));
    let (status, _) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::get().uri(&format!("/buy_orders/{order_id}")).insert_header(bearer(&shop.merchant_token()));
    let (status, _) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::OK);

    let admin = token_for(shop.bob, Role::Customer, "admin@example.com");
    let req = TestRequest::get().uri(&format!("/buy_orders/{order_id}")).insert_header(bearer(&admin));
    let (status, _) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn cancelling_releases_the_hold() {
    let _ = env_logger::try_init().ok();
    let shop = Shop::new().await;
    let (_, placed) = shop.place(shop.alice, 8_000).await;
    let order_id = placed["order"]["id"].as_i64().unwrap();
    let cancel = || {
        TestRequest::post()
            .uri(&format!("/buy_orders/{order_id}/cancel"))
            .insert_header(bearer(&shop.customer_token(shop.alice)))
    };
    let (status, body) = call_api(shop.configure(), cancel()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["status"], "cancelled");
    assert_eq!(shop.processor.cancels().len(), 1);

    let (status, _) = call_api(shop.configure(), cancel()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(shop.processor.cancels().len(), 1);
}

#[actix_web::test]
async fn merchants_filter_their_orders_by_status() {
    let _ = env_logger::try_init().ok();
    let shop = Shop::new().await;
    shop.place(shop.alice, 8_000).await;
    shop.place(shop.bob, 6_000).await;
    let req = TestRequest::post()
        .uri("/discounts")
        .insert_header(bearer(&shop.merchant_token()))
        .set_json(json!({ "product_id": shop.product, "discount_price": 7_000 }));
    let (status, body) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(json(&body)["fulfilled"].as_array().unwrap().len(), 1);

    let list = |status: &str| {
        TestRequest::get()
            .uri(&format!("/merchant/buy_orders?status={status}"))
            .insert_header(bearer(&shop.merchant_token()))
    };
    let (_, body) = call_api(shop.configure(), list("fulfilled")).await;
    let fulfilled = json(&body);
    assert_eq!(fulfilled.as_array().unwrap().len(), 1);
    assert_eq!(fulfilled[0]["customer_id"], shop.alice);
    let (_, body) = call_api(shop.configure(), list("monitoring")).await;
    assert_eq!(json(&body)[0]["customer_id"], shop.bob);
}

#[actix_web::test]
async fn role_checks() {
    let _ = env_logger::try_init().ok();
    let shop = Shop::new().await;
    let req = TestRequest::post()
        .uri("/products")
        .insert_header(bearer(&shop.customer_token(shop.alice)))
        .set_json(json!({ "title": "Grinder", "price": 4_000 }));
    let (status, body) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Insufficient permissions. This action requires the merchant role"}"#);

    let req = TestRequest::post()
        .uri("/products")
        .insert_header(bearer(&shop.merchant_token()))
        .set_json(json!({ "title": "Grinder", "price": 4_000 }));
    let (status, body) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(json(&body)["current_price"], 4_000);

    let req = TestRequest::get().uri("/merchant/buy_orders").insert_header(bearer(&shop.customer_token(shop.alice)));
    let (status, _) = call_api(shop.configure(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
