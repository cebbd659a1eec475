use std::str::FromStr;

use buy_order_engine::{db_types::Role, BuyOrderDatabase};
use chrono::Utc;
use cucumber::{gherkin::Step, then, when};
use e2e::helpers::json_is_subset_of;
use log::debug;
use reqwest::Method;
use serde_json::{json, Value};
use stripe_tools::webhook::{sign_payload, SIGNATURE_HEADER};

use crate::cucumber::{
    setup::{email_for, sign_up},
    world::WEBHOOK_SECRET,
    BuyOrderWorld,
};

#[then("the server is running")]
async fn server_is_running(world: &mut BuyOrderWorld) {
    let (code, body) = world.get("/health").await;
    assert_eq!(code.as_u16(), 200);
    assert_eq!(body, "👍️\n");
}

#[when(expr = "{word} signs up as a {word} with password {string}")]
async fn signs_up(world: &mut BuyOrderWorld, name: String, role: String, password: String) {
    let role = Role::from_str(&role).expect("Invalid role");
    let (code, body) = sign_up(world, &name, role, &password).await;
    world.response = Some((reqwest::StatusCode::from_u16(code).expect("Invalid status"), body));
}

#[when(expr = "{word} logs in as a {word} with password {string}")]
async fn logs_in(world: &mut BuyOrderWorld, name: String, role: String, password: String) {
    let role = Role::from_str(&role).expect("Invalid role");
    let body = json!({ "role": role, "email": email_for(&name), "password": password });
    let (code, res) = world.request(None, Method::POST, "/auth/login", |req| req.json(&body)).await;
    if code.is_success() {
        let auth: Value = serde_json::from_str(&res).expect("Invalid login response");
        let token = auth["token"].as_str().expect("No token in login response").to_string();
        world.tokens.insert(name.clone(), token);
    }
    world.response = Some((code, res));
}

// Alice POSTs to "/api/buy_orders" with body
#[when(expr = "{word} {word}s to {string} with body")]
async fn request_with_body(world: &mut BuyOrderWorld, user: String, method: String, url: String, step: &Step) {
    let method = Method::from_str(method.as_str()).expect("Invalid method");
    let body = step.docstring().cloned();
    let res = world
        .request(Some(&user), method, url.as_str(), |req| match body {
            Some(body) => req.body(body).header("Content-Type", "application/json"),
            None => req,
        })
        .await;
    debug!("Got Response: {} {}", res.0, res.1);
    world.response = Some(res);
}

// Alice GETs "/api/buy_orders"
#[when(expr = "{word} {word}s {string}")]
async fn request_without_body(world: &mut BuyOrderWorld, user: String, method: String, url: String) {
    let method = Method::from_str(method.as_str()).expect("Invalid method");
    let res = world.request(Some(&user), method, url.as_str(), |req| req).await;
    debug!("Got Response: {} {}", res.0, res.1);
    world.response = Some(res);
}

#[when(expr = "Stripe reports that the hold on buy order {int} was {word}")]
async fn stripe_reports(world: &mut BuyOrderWorld, order_id: i64, status: String) {
    let escrow = world
        .database()
        .fetch_escrow_for_order(order_id)
        .await
        .expect("Database error")
        .expect("The order has no escrow payment");
    let payload = json!({
        "id": format!("evt_e2e_{order_id}"),
        "type": format!("payment_intent.{status}"),
        "data": { "object": {
            "object": "payment_intent",
            "id": escrow.payment_intent_id,
            "amount": escrow.escrow_amount,
            "amount_received": if status == "succeeded" { escrow.escrow_amount.value() } else { 0 },
            "currency": "usd",
            "status": status,
            "application_fee_amount": escrow.platform_fee
        }}
    })
    .to_string();
    let signature = sign_payload(payload.as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp()).expect("Could not sign");
    let res = world
        .request(None, Method::POST, "/stripe/webhook", |req| {
            req.header(SIGNATURE_HEADER, signature).header("Content-Type", "application/json").body(payload)
        })
        .await;
    world.response = Some(res);
}

#[then(expr = "I receive a {int} {word} response with the message {string}")]
async fn receive_response(world: &mut BuyOrderWorld, status: u16, text: String, message: String) {
    let (res_status, res_msg) = world.response.take().expect("No response received");
    assert_eq!(res_status, status, "Expected {status} {text} response, got {res_status}");
    assert!(res_msg.contains(&message), "Expected response to contain '{message}', got '{res_msg}'");
}

#[then(expr = "I receive a {int} {word} response")]
async fn receive_response_code(world: &mut BuyOrderWorld, status: u16, text: String) {
    let (res_status, res_msg) = world.response.clone().expect("No response received");
    assert_eq!(res_status, status, "Expected {status} {text} response, got {res_status}: {res_msg}");
}

#[then(expr = "I receive a partial JSON response:")]
async fn receive_json_response(world: &mut BuyOrderWorld, step: &Step) {
    let (_res_status, res_msg) = world.response.take().expect("No response received");
    let expected = step.docstring().expect("No expected response");
    assert!(json_is_subset_of(expected, res_msg.as_str()), "Expected response to match '{expected}', got '{res_msg}'");
}

#[then(expr = "the payment processor has seen {int} hold(s), {int} capture(s) and {int} cancellation(s)")]
async fn processor_calls(world: &mut BuyOrderWorld, holds: usize, captures: usize, cancels: usize) {
    let processor = &world.processor;
    assert_eq!(processor.holds().len(), holds, "holds");
    assert_eq!(processor.captures().len(), captures, "captures");
    assert_eq!(processor.cancels().len(), cancels, "cancellations");
}
