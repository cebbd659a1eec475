use std::fmt::Display;

use bo_common::Cents;
use buy_order_engine::db_types::{BuyOrder, BuyOrderStatus, EscrowPayment, LedgerEntry, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub role: Role,
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub role: Role,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub account_id: i64,
    pub role: Role,
    pub token: String,
}

/// A buy order together with its escrow payment and ledger history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyOrderDetail {
    pub order: BuyOrder,
    pub escrow: Option<EscrowPayment>,
    pub ledger: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderStatusFilter {
    pub status: Option<BuyOrderStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProductParams {
    pub title: String,
    pub price: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePriceParams {
    pub price: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPriceAlertParams {
    pub product_id: i64,
    pub target_price: Cents,
    /// Where to send the alert. Defaults to the customer's account email.
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectOnboarding {
    pub stripe_account_id: String,
    pub onboarding_url: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub integration_id: i64,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub fulfilled_orders: usize,
    pub errors: Vec<String>,
}
