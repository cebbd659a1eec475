use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use buy_order_engine::{
    db_types::{Customer, Role},
    traits::AccountApiError,
    AccountApi,
    SqliteDatabase,
};
use chrono::Utc;
use serde_json::json;

use super::{
    helpers::{bearer, call_api, call_public, json, token_for},
    mocks::MockAccountManager,
};
use crate::{
    auth::hash_password,
    routes::{CheckTokenRoute, LoginRoute, SignupRoute},
    test_helpers::{test_database, test_issuer},
};

fn configure_db(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(AccountApi::new(db)))
            .app_data(web::Data::new(test_issuer()))
            .service(SignupRoute::<SqliteDatabase>::new())
            .service(LoginRoute::<SqliteDatabase>::new());
    }
}

fn configure_mock(mock: MockAccountManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(AccountApi::new(mock)))
            .app_data(web::Data::new(test_issuer()))
            .service(SignupRoute::<MockAccountManager>::new())
            .service(LoginRoute::<MockAccountManager>::new());
    }
}

fn signup(role: &str, email: &str, password: &str) -> TestRequest {
    TestRequest::post().uri("/auth/signup").set_json(json!({
        "role": role,
        "email": email,
        "name": "Test Account",
        "password": password
    }))
}

fn login(role: &str, email: &str, password: &str) -> TestRequest {
    TestRequest::post().uri("/auth/login").set_json(json!({ "role": role, "email": email, "password": password }))
}

#[actix_web::test]
async fn signup_then_login() {
    let _ = env_logger::try_init().ok();
    let db = test_database().await;
    let (status, body) = call_public(configure_db(db.clone()), signup("customer", "alice@example.com", "hunter2hunter2")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let created = json(&body);
    assert_eq!(created["role"], "customer");
    let token = created["token"].as_str().expect("token");
    let claims = test_issuer().validate_token(token).expect("A valid token");
    assert_eq!(claims.account_id, created["account_id"].as_i64().unwrap());
    assert_eq!(claims.roles, vec![Role::Customer]);

    let (status, body) = call_public(configure_db(db.clone()), login("customer", "alice@example.com", "hunter2hunter2")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["account_id"], created["account_id"]);

    let (status, body) = call_public(configure_db(db.clone()), login("customer", "alice@example.com", "wrong-password")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Invalid email or password"}"#);

    // Customer and merchant logins are separate accounts
    let (status, _) = call_public(configure_db(db), login("merchant", "alice@example.com", "hunter2hunter2")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn signup_rejects_short_passwords_and_admins() {
    let _ = env_logger::try_init().ok();
    let db = test_database().await;
    let (status, body) = call_public(configure_db(db.clone()), signup("merchant", "shop@example.com", "short")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("at least 8 characters"), "{body}");
    let (status, _) = call_public(configure_db(db), signup("admin", "root@example.com", "long-enough-password")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn duplicate_signup_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut mock = MockAccountManager::new();
    mock.expect_register_merchant()
        .returning(|a| Err(AccountApiError::EmailAlreadyRegistered(a.email)));
    let (status, body) = call_public(configure_mock(mock), signup("merchant", "shop@example.com", "long-enough-password")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("shop@example.com"), "{body}");
}

#[actix_web::test]
async fn login_grants_admin_to_configured_emails() {
    let _ = env_logger::try_init().ok();
    let hash = hash_password("correct horse battery").unwrap();
    let mut mock = MockAccountManager::new();
    mock.expect_fetch_customer_by_email().returning(move |email| {
        let now = Utc::now();
        let customer =
            Customer { id: 7, email: email.to_string(), name: "Admin".into(), created_at: now, updated_at: now };
        Ok(Some((customer, hash.clone())))
    });
    let (status, body) = call_public(configure_mock(mock), login("customer", "admin@example.com", "correct horse battery")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = json(&body)["token"].as_str().unwrap().to_string();
    let claims = test_issuer().validate_token(&token).unwrap();
    assert!(claims.is_admin());
    assert_eq!(claims.role, Role::Customer);
}

#[actix_web::test]
async fn check_token_needs_a_token() {
    let _ = env_logger::try_init().ok();
    let configure = |cfg: &mut ServiceConfig| {
        cfg.service(CheckTokenRoute::new());
    };
    let (status, body) = call_api(configure, TestRequest::get().uri("/check_token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication required"}"#);

    let req = TestRequest::get().uri("/check_token").insert_header(bearer("not.a.jwt"));
    let (status, body) = call_api(configure, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Invalid access token"), "{body}");

    let token = token_for(3, Role::Merchant, "shop@example.com");
    let req = TestRequest::get().uri("/check_token").insert_header(bearer(&token));
    let (status, body) = call_api(configure, req).await;
    assert_eq!(status, StatusCode::OK);
    let claims = json(&body);
    assert_eq!(claims["account_id"], 3);
    assert_eq!(claims["role"], "merchant");
}
