use buy_order_engine::{db_types::Role, AccountApi};
use cucumber::{given, then};
use log::info;
use reqwest::Method;
use serde_json::{json, Value};

use crate::cucumber::BuyOrderWorld;

pub fn email_for(name: &str) -> String {
    format!("{}@example.com", name.to_lowercase())
}

/// Signs `name` up through the API and keeps the token the server hands back.
pub async fn sign_up(world: &mut BuyOrderWorld, name: &str, role: Role, password: &str) -> (u16, String) {
    let body = json!({ "role": role, "email": email_for(name), "name": name, "password": password });
    let (code, res) = world.request(None, Method::POST, "/auth/signup", |req| req.json(&body)).await;
    if code.is_success() {
        let auth: Value = serde_json::from_str(&res).expect("Invalid signup response");
        let id = auth["account_id"].as_i64().expect("No account id in signup response");
        let token = auth["token"].as_str().expect("No token in signup response").to_string();
        world.accounts.insert(name.to_string(), id);
        world.tokens.insert(name.to_string(), token);
    }
    (code.as_u16(), res)
}

#[given("a blank slate")]
async fn tabula_rasa(world: &mut BuyOrderWorld) {
    world.start_database().await;
    world.start_server().await;
}

#[given(expr = "a customer {word}")]
async fn a_customer(world: &mut BuyOrderWorld, name: String) {
    let (code, res) = sign_up(world, &name, Role::Customer, "correct horse battery").await;
    assert_eq!(code, 201, "Could not sign {name} up: {res}");
}

#[given(expr = "a merchant {word} that accepts Stripe payments")]
async fn a_merchant(world: &mut BuyOrderWorld, name: String) {
    let (code, res) = sign_up(world, &name, Role::Merchant, "correct horse battery").await;
    assert_eq!(code, 201, "Could not sign {name} up: {res}");
    let id = world.account_id(&name);
    let accounts = AccountApi::new(world.database().clone());
    accounts.set_stripe_account(id, &format!("acct_e2e_{id}"), true).await.expect("Could not set Stripe account");
    info!("🌍️ {name} is merchant #{id}");
}

#[given(expr = "{word} sells {string} for {word}")]
async fn merchant_sells(world: &mut BuyOrderWorld, merchant: String, title: String, price: String) {
    let body = json!({ "title": title, "price": e2e::helpers::dollars_to_cents(&price) });
    let (code, res) = world.request(Some(&merchant), Method::POST, "/api/products", |req| req.json(&body)).await;
    assert_eq!(code.as_u16(), 201, "Could not add {title}: {res}");
}

#[then(expr = "pause for {int} ms")]
async fn pause_for_ms(_world: &mut BuyOrderWorld, ms: u64) {
    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
}
