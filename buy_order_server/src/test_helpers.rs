//! Shared fixtures for the server's unit and endpoint tests.
use buy_order_engine::{
    db_types::NewAccount,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountApi,
    SqliteDatabase,
};

use crate::{
    auth::TokenIssuer,
    config::AuthConfig,
};

pub const TEST_JWT_SECRET: &str = "an-adequately-long-jwt-secret-for-tests";

/// A fresh, migrated database in the temp directory.
pub async fn test_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database")
}

pub fn test_issuer() -> TokenIssuer {
    let mut config = AuthConfig::new(TEST_JWT_SECRET);
    config.admin_emails = vec!["admin@example.com".to_string()];
    TokenIssuer::new(&config)
}

fn account(email: &str) -> NewAccount {
    let name = email.split('@').next().unwrap_or(email).to_string();
    NewAccount { email: email.to_string(), name, password_hash: "not-a-real-hash".into() }
}

/// Registers a merchant with a Connect account, so that it can take buy orders.
pub async fn register_merchant(api: &AccountApi<SqliteDatabase>, email: &str) -> i64 {
    let merchant = api.register_merchant(account(email)).await.expect("Error registering merchant");
    let account_id = format!("acct_{}", merchant.id);
    api.set_stripe_account(merchant.id, &account_id, true).await.expect("Error setting Stripe account");
    merchant.id
}

pub async fn register_customer(api: &AccountApi<SqliteDatabase>, email: &str) -> i64 {
    api.register_customer(account(email)).await.expect("Error registering customer").id
}
