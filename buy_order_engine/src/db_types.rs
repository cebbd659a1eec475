use std::{fmt::Display, str::FromStr};

use bo_common::Cents;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

/// Implements `Display` and `FromStr` for the simple text-backed status enums, using the same snake_case strings that
/// are stored in the database and sent over the wire.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ConversionError(format!("Invalid {}: {other}", stringify!($name)))),
                }
            }
        }
    };
}

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Merchant,
    /// Admins pass every role check.
    Admin,
}

text_enum!(Role { Customer => "customer", Merchant => "merchant", Admin => "admin" });

//--------------------------------------      Merchant       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MerchantStatus {
    Active,
    Suspended,
}

text_enum!(MerchantStatus { Active => "active", Suspended => "suspended" });

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Merchant {
    pub id: i64,
    pub email: String,
    pub name: String,
    /// The Stripe Connect account that receives the merchant's share of captured funds.
    pub stripe_account_id: Option<String>,
    /// Whether the processor lets the account take card payments yet. Stripe only enables charges once onboarding
    /// is complete.
    pub charges_enabled: bool,
    pub status: MerchantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Merchant {
    pub fn can_accept_payments(&self) -> bool {
        self.status == MerchantStatus::Active &&
            self.charges_enabled &&
            self.stripe_account_id.as_ref().is_some_and(|s| !s.is_empty())
    }
}

//--------------------------------------      Customer       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields needed to register either a customer or a merchant. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// The stored login details for an account. Never leaves the engine/server boundary.
#[derive(Debug, Clone, FromRow)]
pub struct Credentials {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
}

//--------------------------------------       Product       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductSource {
    Manual,
    Shopify,
    Woocommerce,
}

text_enum!(ProductSource { Manual => "manual", Shopify => "shopify", Woocommerce => "woocommerce" });

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub merchant_id: i64,
    pub title: String,
    /// The list price when the product was first registered.
    pub price: Cents,
    /// The price the product is currently selling for. Buy orders are matched against this price.
    pub current_price: Cents,
    pub source: ProductSource,
    /// The identifier of the product on the external storefront, if it was imported.
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub merchant_id: i64,
    pub title: String,
    pub price: Cents,
    pub source: ProductSource,
    pub source_id: Option<String>,
}

impl NewProduct {
    pub fn new<S: Into<String>>(merchant_id: i64, title: S, price: Cents) -> Self {
        Self { merchant_id, title: title.into(), price, source: ProductSource::Manual, source_id: None }
    }

    pub fn with_source<S: Into<String>>(mut self, source: ProductSource, source_id: S) -> Self {
        self.source = source;
        self.source_id = Some(source_id.into());
        self
    }
}

//--------------------------------------    PriceHistory     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PriceChangeSource {
    /// A merchant changed the price through the API.
    Manual,
    /// A storefront pushed a product update webhook.
    Webhook,
    /// A catalog sync pulled a new price from the storefront.
    Sync,
}

text_enum!(PriceChangeSource { Manual => "manual", Webhook => "webhook", Sync => "sync" });

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PriceHistory {
    pub id: i64,
    pub product_id: i64,
    pub old_price: Cents,
    pub new_price: Cents,
    pub source: PriceChangeSource,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   BuyOrderStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BuyOrderStatus {
    /// Reserved for orders whose hold has not been confirmed yet. Orders are only ever persisted once the hold is
    /// authorized, so this status is never written by the engine.
    Pending,
    /// Funds are held and the order is waiting for the price to drop to the target.
    Monitoring,
    Fulfilled,
    Cancelled,
    Expired,
}

text_enum!(BuyOrderStatus {
    Pending => "pending",
    Monitoring => "monitoring",
    Fulfilled => "fulfilled",
    Cancelled => "cancelled",
    Expired => "expired",
});

impl BuyOrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Fulfilled | Self::Cancelled | Self::Expired)
    }
}

//--------------------------------------     EscrowTerms     ---------------------------------------------------------
/// How a held amount is split between the platform and the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub amount: Cents,
    pub platform_fee: Cents,
    pub merchant_share: Cents,
    pub fee_rate_bps: u32,
}

impl FeeSplit {
    /// Splits `amount` at `fee_rate_bps`, rounding the platform fee half up to the nearest cent.
    pub fn compute(amount: Cents, fee_rate_bps: u32) -> Self {
        let platform_fee = amount.fee_at(fee_rate_bps);
        Self { amount, platform_fee, merchant_share: amount - platform_fee, fee_rate_bps }
    }
}

/// The escrow terms recorded with a buy order when its hold is authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTerms {
    pub payment_intent_id: String,
    pub escrow_amount: Cents,
    pub platform_fee: Cents,
    pub merchant_share: Cents,
    pub fee_rate_bps: u32,
}

impl EscrowTerms {
    pub fn new<S: Into<String>>(payment_intent_id: S, split: FeeSplit) -> Self {
        Self {
            payment_intent_id: payment_intent_id.into(),
            escrow_amount: split.amount,
            platform_fee: split.platform_fee,
            merchant_share: split.merchant_share,
            fee_rate_bps: split.fee_rate_bps,
        }
    }
}

//--------------------------------------       BuyOrder      ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BuyOrder {
    pub id: i64,
    pub customer_id: i64,
    pub merchant_id: i64,
    pub product_id: i64,
    pub target_price: Cents,
    /// The product price when the order was placed.
    pub current_price: Cents,
    pub status: BuyOrderStatus,
    pub expires_at: DateTime<Utc>,
    pub condition_value: Json<EscrowTerms>,
    /// The price at which the order was filled. This can be lower than the target price.
    pub fulfilled_price: Option<Cents>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BuyOrder {
    pub fn terms(&self) -> &EscrowTerms {
        &self.condition_value.0
    }

    pub fn payment_intent_id(&self) -> &str {
        self.condition_value.0.payment_intent_id.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct NewBuyOrder {
    pub customer_id: i64,
    pub merchant_id: i64,
    pub product_id: i64,
    pub target_price: Cents,
    pub current_price: Cents,
    pub expires_at: DateTime<Utc>,
    pub terms: EscrowTerms,
}

//--------------------------------------    EscrowPayment    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Held,
    /// Captured and paid out to the merchant, less the platform fee.
    Released,
    /// The hold was cancelled and the funds returned to the customer.
    Refunded,
}

text_enum!(EscrowStatus { Held => "held", Released => "released", Refunded => "refunded" });

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EscrowPayment {
    pub id: i64,
    pub buy_order_id: i64,
    pub payment_intent_id: String,
    pub escrow_amount: Cents,
    pub platform_fee: Cents,
    pub merchant_share: Cents,
    pub captured_amount: Option<Cents>,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     LedgerEntry     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    Authorize,
    Capture,
    Cancel,
}

text_enum!(LedgerAction { Authorize => "authorize", Capture => "capture", Cancel => "cancel" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerState {
    /// The processor call has been (or is about to be) made, but its outcome is not yet recorded.
    Pending,
    Succeeded,
    Failed,
}

text_enum!(LedgerState { Pending => "pending", Succeeded => "succeeded", Failed => "failed" });

/// A record of a single money-moving call to the payment processor.
///
/// Entries are written *before* the call is made, and their idempotency key is passed to the processor, so that an
/// interrupted call can always be retried or reconciled without moving money twice.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub buy_order_id: Option<i64>,
    pub payment_intent_id: Option<String>,
    pub action: LedgerAction,
    pub state: LedgerState,
    pub amount: Cents,
    pub platform_fee: Cents,
    pub idempotency_key: String,
    /// The buy order status this entry moves the order to once it succeeds.
    pub resolves_to: Option<BuyOrderStatus>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub buy_order_id: Option<i64>,
    pub payment_intent_id: Option<String>,
    pub action: LedgerAction,
    pub amount: Cents,
    pub platform_fee: Cents,
    pub idempotency_key: String,
    pub resolves_to: Option<BuyOrderStatus>,
}

impl NewLedgerEntry {
    pub fn new(action: LedgerAction, amount: Cents, platform_fee: Cents) -> Self {
        let idempotency_key = format!("bo-{action}-{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>());
        let resolves_to = match action {
            LedgerAction::Authorize => Some(BuyOrderStatus::Monitoring),
            LedgerAction::Capture => Some(BuyOrderStatus::Fulfilled),
            LedgerAction::Cancel => Some(BuyOrderStatus::Cancelled),
        };
        Self { buy_order_id: None, payment_intent_id: None, action, amount, platform_fee, idempotency_key, resolves_to }
    }

    pub fn for_order(mut self, buy_order_id: i64, payment_intent_id: &str) -> Self {
        self.buy_order_id = Some(buy_order_id);
        self.payment_intent_id = Some(payment_intent_id.to_string());
        self
    }

    pub fn resolving_to(mut self, status: BuyOrderStatus) -> Self {
        self.resolves_to = Some(status);
        self
    }
}

//--------------------------------------  MerchantDiscount   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountStatus {
    Active,
    Exhausted,
    Expired,
}

text_enum!(DiscountStatus { Active => "active", Exhausted => "exhausted", Expired => "expired" });

/// A merchant-issued price that fulfills waiting buy orders without changing the public product price.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MerchantDiscount {
    pub id: i64,
    pub merchant_id: i64,
    pub product_id: i64,
    pub discount_price: Cents,
    /// When non-empty, only orders from these customers are eligible.
    pub customer_ids: Json<Vec<i64>>,
    /// When non-empty, only these buy orders are eligible.
    pub order_ids: Json<Vec<i64>>,
    pub max_uses: Option<i64>,
    pub uses: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: DiscountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MerchantDiscount {
    /// Whether the discount may be applied to `order`, ignoring usage counts.
    pub fn applies_to(&self, order: &BuyOrder) -> bool {
        order.product_id == self.product_id
            && order.status == BuyOrderStatus::Monitoring
            && order.target_price >= self.discount_price
            && (self.customer_ids.0.is_empty() || self.customer_ids.0.contains(&order.customer_id))
            && (self.order_ids.0.is_empty() || self.order_ids.0.contains(&order.id))
    }

    pub fn remaining_uses(&self) -> Option<i64> {
        self.max_uses.map(|m| (m - self.uses).max(0))
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == DiscountStatus::Active
            && self.remaining_uses().map_or(true, |r| r > 0)
            && self.expires_at.map_or(true, |t| t > now)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDiscount {
    pub product_id: i64,
    pub discount_price: Cents,
    #[serde(default)]
    pub customer_ids: Vec<i64>,
    #[serde(default)]
    pub order_ids: Vec<i64>,
    pub max_uses: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

//--------------------------------------    Notification     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    Customer,
    Merchant,
}

text_enum!(RecipientKind { Customer => "customer", Merchant => "merchant" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub kind: RecipientKind,
    pub id: i64,
}

impl Recipient {
    pub fn customer(id: i64) -> Self {
        Self { kind: RecipientKind::Customer, id }
    }

    pub fn merchant(id: i64) -> Self {
        Self { kind: RecipientKind::Merchant, id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderCreated,
    OrderReceived,
    OrderFulfilled,
    OrderSold,
    OrderCancelled,
    OrderExpired,
    PriceAlert,
}

text_enum!(NotificationKind {
    OrderCreated => "order_created",
    OrderReceived => "order_received",
    OrderFulfilled => "order_fulfilled",
    OrderSold => "order_sold",
    OrderCancelled => "order_cancelled",
    OrderExpired => "order_expired",
    PriceAlert => "price_alert",
});

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_kind: RecipientKind,
    pub recipient_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub buy_order_id: Option<i64>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient: Recipient,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub buy_order_id: Option<i64>,
}

//--------------------------------------     PriceAlert      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Triggered,
    /// Withdrawn by the customer.
    Expired,
}

text_enum!(AlertStatus { Active => "active", Triggered => "triggered", Expired => "expired" });

/// A request to be told, without any money being held, when a product drops to a price.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: i64,
    pub customer_id: i64,
    pub product_id: i64,
    pub email: String,
    pub target_price: Cents,
    pub status: AlertStatus,
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPriceAlert {
    pub customer_id: i64,
    pub product_id: i64,
    pub email: String,
    pub target_price: Cents,
}

//--------------------------------------     Integration     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Shopify,
    Woocommerce,
}

text_enum!(Platform { Shopify => "shopify", Woocommerce => "woocommerce" });

impl From<Platform> for ProductSource {
    fn from(value: Platform) -> Self {
        match value {
            Platform::Shopify => ProductSource::Shopify,
            Platform::Woocommerce => ProductSource::Woocommerce,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    Connected,
    Disconnected,
}

text_enum!(IntegrationStatus { Connected => "connected", Disconnected => "disconnected" });

/// A merchant's connection to an external storefront.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Integration {
    pub id: i64,
    pub merchant_id: i64,
    pub platform: Platform,
    /// The shop domain (Shopify) or site URL (WooCommerce). Unique per platform.
    pub shop_domain: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    /// Secret used to sign the storefront's webhooks (Shopify) or the consumer secret (WooCommerce).
    #[serde(skip_serializing)]
    pub api_secret: Option<String>,
    pub status: IntegrationStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIntegration {
    pub platform: Platform,
    pub shop_domain: String,
    pub access_token: String,
    pub api_secret: Option<String>,
}

//--------------------------------------      EmailLog       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Sent,
    Failed,
}

text_enum!(EmailStatus { Sent => "sent", Failed => "failed" });

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: i64,
    pub recipient: String,
    pub subject: String,
    pub status: EmailStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEmailLog {
    pub recipient: String,
    pub subject: String,
    pub status: EmailStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fee_split() {
        let split = FeeSplit::compute(Cents::from(8000), 250);
        assert_eq!(split.platform_fee, Cents::from(200));
        assert_eq!(split.merchant_share, Cents::from(7800));
        let split = FeeSplit::compute(Cents::from(13999), 250);
        assert_eq!(split.platform_fee, Cents::from(350));
        assert_eq!(split.merchant_share, Cents::from(13649));
    }

    #[test]
    fn status_strings() {
        assert_eq!(BuyOrderStatus::Monitoring.to_string(), "monitoring");
        assert_eq!("fulfilled".parse::<BuyOrderStatus>().unwrap(), BuyOrderStatus::Fulfilled);
        assert!("Fulfilled".parse::<BuyOrderStatus>().is_err());
        assert!(BuyOrderStatus::Expired.is_terminal());
        assert!(!BuyOrderStatus::Monitoring.is_terminal());
        assert_eq!(serde_json::to_string(&NotificationKind::OrderSold).unwrap(), "\"order_sold\"");
        assert_eq!("woocommerce".parse::<Platform>().unwrap(), Platform::Woocommerce);
    }

    #[test]
    fn ledger_keys_are_unique() {
        let a = NewLedgerEntry::new(LedgerAction::Capture, Cents::from(100), Cents::from(3));
        let b = NewLedgerEntry::new(LedgerAction::Capture, Cents::from(100), Cents::from(3));
        assert!(a.idempotency_key.starts_with("bo-capture-"));
        assert_ne!(a.idempotency_key, b.idempotency_key);
    }

    #[test]
    fn discount_eligibility() {
        let now = Utc::now();
        let order = BuyOrder {
            id: 7,
            customer_id: 3,
            merchant_id: 1,
            product_id: 2,
            target_price: Cents::from(15000),
            current_price: Cents::from(18000),
            status: BuyOrderStatus::Monitoring,
            expires_at: now,
            condition_value: Json(EscrowTerms::new("pi_1", FeeSplit::compute(Cents::from(15000), 250))),
            fulfilled_price: None,
            created_at: now,
            updated_at: now,
        };
        let mut discount = MerchantDiscount {
            id: 1,
            merchant_id: 1,
            product_id: 2,
            discount_price: Cents::from(14000),
            customer_ids: Json(vec![]),
            order_ids: Json(vec![]),
            max_uses: Some(2),
            uses: 1,
            expires_at: None,
            status: DiscountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        assert!(discount.applies_to(&order));
        assert!(discount.is_usable(now));
        assert_eq!(discount.remaining_uses(), Some(1));
        discount.customer_ids = Json(vec![4, 5]);
        assert!(!discount.applies_to(&order));
        discount.customer_ids = Json(vec![3]);
        discount.order_ids = Json(vec![8]);
        assert!(!discount.applies_to(&order));
        discount.order_ids = Json(vec![7]);
        discount.discount_price = Cents::from(15001);
        assert!(!discount.applies_to(&order));
        discount.uses = 2;
        assert!(!discount.is_usable(now));
    }
}
