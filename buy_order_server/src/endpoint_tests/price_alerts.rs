use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bo_common::Cents;
use buy_order_engine::{
    db_types::{NewProduct, Role},
    traits::CatalogManagement,
    AccountApi,
    PriceAlertApi,
    SqliteDatabase,
};
use serde_json::json;

use super::helpers::{bearer, call_api, json, token_for};
use crate::{
    routes::{
        CancelPriceAlertRoute,
        CreatePriceAlertRoute,
        DeletePriceAlertRoute,
        MyPriceAlertsRoute,
        PriceAlertByIdRoute,
    },
    test_helpers::{register_customer, register_merchant, test_database},
};

async fn setup() -> (SqliteDatabase, i64, i64, i64) {
    let db = test_database().await;
    let accounts = AccountApi::new(db.clone());
    let merchant = register_merchant(&accounts, "shop@example.com").await;
    let alice = register_customer(&accounts, "alice@example.com").await;
    let bob = register_customer(&accounts, "bob@example.com").await;
    let product = db
        .upsert_product(NewProduct::new(merchant, "Headphones", Cents::from(25_000)))
        .await
        .expect("Error adding product")
        .product
        .id;
    (db, product, alice, bob)
}

fn configure(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(PriceAlertApi::new(db)))
            .service(CreatePriceAlertRoute::<SqliteDatabase>::new())
            .service(MyPriceAlertsRoute::<SqliteDatabase>::new())
            .service(PriceAlertByIdRoute::<SqliteDatabase>::new())
            .service(CancelPriceAlertRoute::<SqliteDatabase>::new())
            .service(DeletePriceAlertRoute::<SqliteDatabase>::new());
    }
}


#[actix_web::test]
async fn alerts_default_to_the_account_email() {
    let _ = env_logger::try_init().ok();
    let (db, product, alice_id, _) = setup().await;
    let token = token_for(alice_id, Role::Customer, "Alice@Example.com");
    let req = TestRequest::post()
        .uri("/price_alerts")
        .insert_header(bearer(&token))
        .set_json(json!({ "product_id": product, "target_price": 20_000 }));
    let (status, body) = call_api(configure(db.clone()), req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let alert = json(&body);
    assert_eq!(alert["email"], "alice@example.com");
    assert_eq!(alert["status"], "active");
    assert_eq!(alert["customer_id"], alice_id);

    let req = TestRequest::post()
        .uri("/price_alerts")
        .insert_header(bearer(&token))
        .set_json(json!({ "product_id": product, "target_price": 18_000, "email": "deals@example.com" }));
    let (status, _) = call_api(configure(db.clone()), req).await;
    assert_eq!(status, StatusCode::CREATED);

    let req = TestRequest::get().uri("/price_alerts").insert_header(bearer(&token));
    let (status, body) = call_api(configure(db), req).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = json(&body);
    assert_eq!(alerts.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn bad_alerts_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (db, product, alice_id, _) = setup().await;
    let token = token_for(alice_id, Role::Customer, "alice@example.com");
    let req = TestRequest::post()
        .uri("/price_alerts")
        .insert_header(bearer(&token))
        .set_json(json!({ "product_id": product, "target_price": 0 }));
    let (status, _) = call_api(configure(db.clone()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri("/price_alerts")
        .insert_header(bearer(&token))
        .set_json(json!({ "product_id": product + 100, "target_price": 100 }));
    let (status, _) = call_api(configure(db.clone()), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let merchant = token_for(1, Role::Merchant, "shop@example.com");
    let req = TestRequest::post()
        .uri("/price_alerts")
        .insert_header(bearer(&merchant))
        .set_json(json!({ "product_id": product, "target_price": 100 }));
    let (status, _) = call_api(configure(db), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn alerts_belong_to_their_owner() {
    let _ = env_logger::try_init().ok();
    let (db, product, alice_id, bob_id) = setup().await;
    let api = PriceAlertApi::new(db.clone());
    let alert = api.create_alert(alice_id, "alice@example.com", product, Cents::from(20_000)).await.unwrap();
    let bob = token_for(bob_id, Role::Customer, "bob@example.com");

    let req = TestRequest::get().uri(&format!("/price_alerts/{}", alert.id)).insert_header(bearer(&bob));
    let (status, _) = call_api(configure(db.clone()), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::delete().uri(&format!("/price_alerts/{}", alert.id)).insert_header(bearer(&bob));
    let (status, _) = call_api(configure(db.clone()), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::get().uri("/price_alerts").insert_header(bearer(&bob));
    let (_, body) = call_api(configure(db.clone()), req).await;
    assert_eq!(json(&body), json!([]));

    let admin = token_for(bob_id, Role::Customer, "admin@example.com");
    let req = TestRequest::get().uri(&format!("/price_alerts/{}", alert.id)).insert_header(bearer(&admin));
    let (status, body) = call_api(configure(db), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["id"], alert.id);
}

#[actix_web::test]
async fn cancel_then_delete() {
    let _ = env_logger::try_init().ok();
    let (db, product, alice_id, _) = setup().await;
    let api = PriceAlertApi::new(db.clone());
    let alert = api.create_alert(alice_id, "alice@example.com", product, Cents::from(20_000)).await.unwrap();
    let token = token_for(alice_id, Role::Customer, "alice@example.com");

    let req = TestRequest::post().uri(&format!("/price_alerts/{}/cancel", alert.id)).insert_header(bearer(&token));
    let (status, body) = call_api(configure(db.clone()), req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["status"], "expired");

    let req = TestRequest::delete().uri(&format!("/price_alerts/{}", alert.id)).insert_header(bearer(&token));
    let (status, body) = call_api(configure(db.clone()), req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let req = TestRequest::get().uri(&format!("/price_alerts/{}", alert.id)).insert_header(bearer(&token));
    let (status, _) = call_api(configure(db), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
