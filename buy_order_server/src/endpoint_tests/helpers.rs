use actix_web::{
    body::to_bytes,
    http::{header, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use buy_order_engine::db_types::Role;
use log::debug;

use crate::{middleware::JwtMiddlewareFactory, test_helpers::test_issuer};

pub fn token_for(account_id: i64, role: Role, email: &str) -> String {
    test_issuer().issue_token(account_id, role, email).expect("Failed to sign token")
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

// `App`'s service factory type depends on its middleware, so the request is sent from a macro rather than a function
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let service = test::init_service($app).await;
        debug!("Making request");
        match test::try_call_service(&service, $req.to_request()).await {
            Ok(res) => {
                let status = res.status();
                let body = to_bytes(res.into_body()).await.map_err(|_| ()).expect("Could not read body");
                (status, String::from_utf8_lossy(&body).into_owned())
            },
            Err(e) => {
                let res = e.error_response();
                let status = res.status();
                let body = to_bytes(res.into_body()).await.map_err(|_| ()).expect("Could not read body");
                (status, String::from_utf8_lossy(&body).into_owned())
            },
        }
    }};
}

/// Sends `req` through an app built by `configure`, behind the bearer token middleware.
pub async fn call_api<F>(configure: F, req: TestRequest) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send!(App::new().wrap(JwtMiddlewareFactory::new(test_issuer())).configure(configure), req)
}

/// Sends `req` through an app built by `configure`, without authentication.
pub async fn call_public<F>(configure: F, req: TestRequest) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send!(App::new().configure(configure), req)
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Invalid JSON ({e}): {body}"))
}
