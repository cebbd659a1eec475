use bo_common::{Cents, DEFAULT_CURRENCY_CODE};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::db_types::{BuyOrder, EscrowPayment, MerchantDiscount, PriceAlert, Product};

/// Tunables for the buy order flow.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    /// The platform fee, in basis points of the held (and later captured) amount.
    pub fee_rate_bps: u32,
    pub default_expiry_days: i64,
    pub max_expiry_days: i64,
    pub currency: String,
    /// A hold with no buy order is only treated as orphaned once its authorize entry is at least this old. Younger
    /// entries may still belong to a `create_buy_order` call that is in progress.
    pub orphan_grace: Duration,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            fee_rate_bps: 250,
            default_expiry_days: 30,
            max_expiry_days: 90,
            currency: DEFAULT_CURRENCY_CODE.into(),
            orphan_grace: Duration::minutes(10),
        }
    }
}

/// A customer's request to place a buy order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBuyOrderRequest {
    pub product_id: i64,
    pub target_price: Cents,
    /// A processor payment method token, e.g. `pm_card_visa`.
    pub payment_method: String,
    /// Defaults to [`FlowOptions::default_expiry_days`] when omitted.
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

/// Who is asking for a buy order to be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer(i64),
    Merchant(i64),
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: BuyOrder,
    pub escrow: EscrowPayment,
}

/// Why a single order could not be fulfilled or annulled during a batch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFailure {
    pub buy_order_id: i64,
    pub error: String,
}

impl OrderFailure {
    pub fn new<E: ToString>(buy_order_id: i64, error: E) -> Self {
        Self { buy_order_id, error: error.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChangeReport {
    pub product: Product,
    pub old_price: Cents,
    pub new_price: Cents,
    pub fulfilled: Vec<BuyOrder>,
    pub failures: Vec<OrderFailure>,
    pub alerts: Vec<PriceAlert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountReport {
    /// The discount as it stands after matching, i.e. with `uses` and `status` updated.
    pub discount: MerchantDiscount,
    pub fulfilled: Vec<BuyOrder>,
    pub failures: Vec<OrderFailure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpiryReport {
    pub expired: Vec<BuyOrder>,
    pub failures: Vec<OrderFailure>,
    pub discounts_expired: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Ids of the ledger entries that were moved out of `pending`.
    pub resolved: Vec<i64>,
    /// Orders whose status changed as a result.
    pub orders: Vec<BuyOrder>,
}

impl ReconcileReport {
    pub fn merge(&mut self, other: ReconcileReport) {
        self.resolved.extend(other.resolved);
        self.orders.extend(other.orders);
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.orders.is_empty()
    }
}
