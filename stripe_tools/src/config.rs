use bo_common::Secret;
use log::*;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    /// Overridable so that tests and staging environments can point at a mock server.
    pub api_base: String,
}

impl StripeConfig {
    pub fn new(secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            secret_key: Secret::new(secret_key.to_string()),
            webhook_secret: Secret::new(webhook_secret.to_string()),
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
        }
    }

    pub fn new_from_env_or_default() -> Self {
        let secret_key = Secret::new(std::env::var("BOS_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ BOS_STRIPE_SECRET_KEY not set. Payment calls will be rejected by Stripe.");
            String::default()
        }));
        let webhook_secret = Secret::new(std::env::var("BOS_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ BOS_STRIPE_WEBHOOK_SECRET not set. All Stripe webhook calls will be rejected.");
            String::default()
        }));
        let api_base = std::env::var("BOS_STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string());
        Self { secret_key, webhook_secret, api_base }
    }
}
