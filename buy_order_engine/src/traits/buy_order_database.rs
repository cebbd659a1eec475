use bo_common::Cents;
use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{
        BuyOrder,
        BuyOrderStatus,
        EscrowPayment,
        LedgerEntry,
        MerchantDiscount,
        NewBuyOrder,
        NewDiscount,
        NewLedgerEntry,
        PriceAlert,
        PriceChangeSource,
    },
    traits::{
        AccountApiError,
        AccountManagement,
        CatalogApiError,
        CatalogManagement,
        NotificationApiError,
        NotificationManagement,
        PriceChange,
    },
};

/// This trait defines the highest level of behaviour for backends supporting the buy order engine.
///
/// This behaviour includes:
/// * Recording every payment processor call in the escrow ledger *before* it is made.
/// * Atomically settling buy orders, escrow payments and ledger entries once the processor has answered.
/// * Handling product price changes and selecting the orders that they fulfil.
/// * Merchant discounts and price alert triggers.
///
/// Every settlement method is guarded on the current state of the rows it touches, so that two concurrent attempts to
/// settle the same order cannot both succeed.
#[allow(async_fn_in_trait)]
pub trait BuyOrderDatabase: Clone + AccountManagement + CatalogManagement + NotificationManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    async fn fetch_buy_order(&self, id: i64) -> Result<Option<BuyOrder>, BuyOrderError>;

    async fn fetch_buy_order_by_intent(&self, payment_intent_id: &str) -> Result<Option<BuyOrder>, BuyOrderError>;

    /// The customer's buy orders, newest first.
    async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<BuyOrder>, BuyOrderError>;

    /// Buy orders placed against the merchant's products, newest first, optionally restricted to one status.
    async fn orders_for_merchant(
        &self,
        merchant_id: i64,
        status: Option<BuyOrderStatus>,
    ) -> Result<Vec<BuyOrder>, BuyOrderError>;

    async fn fetch_escrow_for_order(&self, buy_order_id: i64) -> Result<Option<EscrowPayment>, BuyOrderError>;

    /// Ledger entries for the order, oldest first.
    async fn ledger_for_order(&self, buy_order_id: i64) -> Result<Vec<LedgerEntry>, BuyOrderError>;

    async fn fetch_ledger_entry(&self, ledger_id: i64) -> Result<Option<LedgerEntry>, BuyOrderError>;

    /// Writes a `pending` ledger entry ahead of a processor call.
    ///
    /// When the entry refers to an existing buy order, the order must still be monitoring
    /// ([`BuyOrderError::OrderNotMonitoring`]) and must not have another pending entry
    /// ([`BuyOrderError::EscrowOperationInFlight`]).
    async fn open_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, BuyOrderError>;

    /// Records the processor's payment intent id against a pending entry.
    async fn attach_intent_to_ledger(&self, ledger_id: i64, payment_intent_id: &str)
        -> Result<LedgerEntry, BuyOrderError>;

    /// Marks a pending entry as failed. No money moved (or it has been returned).
    async fn fail_ledger_entry(&self, ledger_id: i64, reason: &str) -> Result<LedgerEntry, BuyOrderError>;

    async fn pending_ledger_for_intent(&self, payment_intent_id: &str) -> Result<Vec<LedgerEntry>, BuyOrderError>;

    /// Pending entries that have not been touched for at least `older_than`.
    async fn stale_pending_ledger(&self, older_than: Duration) -> Result<Vec<LedgerEntry>, BuyOrderError>;

    /// Settles a pending `authorize` entry. In a single transaction, the buy order is inserted as `monitoring`, its
    /// escrow payment is inserted as `held`, and the ledger entry is marked succeeded and linked to the new order.
    async fn insert_buy_order(
        &self,
        ledger_id: i64,
        order: NewBuyOrder,
    ) -> Result<(BuyOrder, EscrowPayment), BuyOrderError>;

    /// Settles a pending `capture` entry. In a single transaction the buy order moves from `monitoring` to `fulfilled`
    /// at the captured amount, the escrow payment moves from `held` to `released` with the fee and merchant share
    /// recomputed on the captured amount, and the ledger entry is marked succeeded.
    async fn settle_capture(&self, ledger_id: i64) -> Result<(BuyOrder, EscrowPayment), BuyOrderError>;

    /// Settles a pending `cancel` entry. In a single transaction the buy order moves from `monitoring` to the status
    /// recorded on the entry (cancelled or expired), the escrow payment moves from `held` to `refunded`, and the
    /// ledger entry is marked succeeded.
    async fn settle_release(&self, ledger_id: i64) -> Result<(BuyOrder, EscrowPayment), BuyOrderError>;

    /// Atomically sets the product's current price and appends a price history record. Nothing is written when the
    /// price is unchanged.
    async fn update_product_price(
        &self,
        product_id: i64,
        new_price: Cents,
        source: PriceChangeSource,
    ) -> Result<PriceChange, BuyOrderError>;

    /// Unexpired, monitoring buy orders for the product whose target price is at or above `price`. Orders with the
    /// highest target come first, and orders with equal targets are returned oldest first.
    async fn fulfillable_orders(&self, product_id: i64, price: Cents) -> Result<Vec<BuyOrder>, BuyOrderError>;

    /// Monitoring buy orders whose expiry time has passed.
    async fn orders_due_for_expiry(&self) -> Result<Vec<BuyOrder>, BuyOrderError>;

    async fn insert_discount(&self, merchant_id: i64, discount: NewDiscount)
        -> Result<MerchantDiscount, BuyOrderError>;

    async fn fetch_discount(&self, id: i64) -> Result<Option<MerchantDiscount>, BuyOrderError>;

    /// Discounts for the product that are active, unexpired and have uses remaining, lowest price first.
    async fn active_discounts_for_product(&self, product_id: i64) -> Result<Vec<MerchantDiscount>, BuyOrderError>;

    async fn discounts_for_merchant(&self, merchant_id: i64) -> Result<Vec<MerchantDiscount>, BuyOrderError>;

    /// Reserves one use of the discount. The discount becomes `exhausted` when the last use is taken. Returns `None`
    /// if the discount is no longer usable.
    async fn claim_discount_use(&self, id: i64) -> Result<Option<MerchantDiscount>, BuyOrderError>;

    /// Returns a use reserved with [`Self::claim_discount_use`] after the fulfillment it was reserved for failed.
    async fn release_discount_use(&self, id: i64) -> Result<MerchantDiscount, BuyOrderError>;

    /// Marks active discounts whose expiry time has passed as `expired`, returning the number affected.
    async fn expire_lapsed_discounts(&self) -> Result<u64, BuyOrderError>;

    /// Moves active price alerts for the product with a target at or above `price` to `triggered` and returns them.
    async fn trigger_price_alerts(&self, product_id: i64, price: Cents) -> Result<Vec<PriceAlert>, BuyOrderError>;

    async fn close(&mut self) -> Result<(), BuyOrderError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum BuyOrderError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    AccountError(#[from] AccountApiError),
    #[error("{0}")]
    CatalogError(#[from] CatalogApiError),
    #[error("{0}")]
    NotificationError(#[from] NotificationApiError),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Merchant {0} does not exist")]
    MerchantNotFound(i64),
    #[error("Customer {0} does not exist")]
    CustomerNotFound(i64),
    #[error("Buy order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Ledger entry {0} does not exist")]
    LedgerEntryNotFound(i64),
    #[error("Discount {0} does not exist")]
    DiscountNotFound(i64),
    #[error("Merchant {0} cannot accept payments yet")]
    MerchantPaymentsNotEnabled(i64),
    #[error("Product {0} belongs to another merchant")]
    NotProductOwner(i64),
    #[error("Buy order {0} belongs to another account")]
    NotOrderOwner(i64),
    #[error("Invalid target price: {0}")]
    InvalidTargetPrice(String),
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),
    #[error("Invalid discount: {0}")]
    InvalidDiscount(String),
    #[error("A payment method is required")]
    MissingPaymentMethod,
    #[error("Payment authorization failed")]
    PaymentAuthorizationFailed { status: String },
    #[error("Payment processor error: {0}")]
    PaymentProcessorError(String),
    #[error("Another escrow operation is already in progress for buy order {0}")]
    EscrowOperationInFlight(i64),
    #[error("Buy order {0} is {1}, not monitoring")]
    OrderNotMonitoring(i64, BuyOrderStatus),
    #[error("Cannot modify buy order: {0}")]
    OrderModificationForbidden(String),
    #[error("The buy order is already in the requested state")]
    OrderModificationNoOp,
    #[error("Ledger entry {0} is no longer pending")]
    LedgerEntryNotPending(i64),
    #[error("Inconsistent escrow state: {0}")]
    InconsistentEscrowState(String),
}

impl From<sqlx::Error> for BuyOrderError {
    fn from(e: sqlx::Error) -> Self {
        BuyOrderError::DatabaseError(e.to_string())
    }
}
