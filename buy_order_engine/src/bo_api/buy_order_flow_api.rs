use std::{
    collections::{BTreeMap, HashSet},
    fmt::Debug,
};

use bo_common::Cents;
use chrono::{Duration, Utc};
use log::*;

use crate::{
    bo_api::order_objects::{
        Actor,
        DiscountReport,
        ExpiryReport,
        FlowOptions,
        NewBuyOrderRequest,
        OrderFailure,
        PlacedOrder,
        PriceChangeReport,
        ReconcileReport,
    },
    db_types::{
        BuyOrder,
        BuyOrderStatus,
        EscrowPayment,
        EscrowTerms,
        FeeSplit,
        LedgerAction,
        LedgerEntry,
        LedgerState,
        MerchantDiscount,
        NewBuyOrder,
        NewDiscount,
        NewLedgerEntry,
        NewNotification,
        NotificationKind,
        PriceAlert,
        PriceChangeSource,
        Product,
        Recipient,
        RecipientKind,
    },
    events::{
        EventProducers,
        NotificationEvent,
        OrderAnnulledEvent,
        OrderCreatedEvent,
        OrderFulfilledEvent,
        PriceAlertTriggeredEvent,
    },
    traits::{BuyOrderDatabase, BuyOrderError, HoldRequest, IntentInfo, IntentStatus, PaymentProcessor, ProcessorError},
};

/// `BuyOrderFlowApi` is the primary API for the buy order life cycle.
///
/// Every call that moves money follows the same pattern:
/// 1. A `pending` entry is written to the escrow ledger. Its idempotency key is sent with the processor call.
/// 2. The payment processor is called.
/// 3. The buy order, its escrow payment and the ledger entry are settled in a single database transaction.
///
/// If the process dies between steps 2 and 3, the entry stays `pending` and is picked up by
/// [`Self::reconcile_stale_ledger`], or by [`Self::reconcile_intent`] when the processor's webhook arrives.
pub struct BuyOrderFlowApi<B, P> {
    db: B,
    processor: P,
    producers: EventProducers,
    options: FlowOptions,
}

impl<B, P> Debug for BuyOrderFlowApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuyOrderFlowApi ({:?})", self.options)
    }
}

impl<B: Clone, P: Clone> Clone for BuyOrderFlowApi<B, P> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            processor: self.processor.clone(),
            producers: self.producers.clone(),
            options: self.options.clone(),
        }
    }
}

impl<B, P> BuyOrderFlowApi<B, P> {
    pub fn new(db: B, processor: P, producers: EventProducers) -> Self {
        Self { db, processor, producers, options: FlowOptions::default() }
    }

    pub fn with_options(mut self, options: FlowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }
}

impl<B, P> BuyOrderFlowApi<B, P>
where
    B: BuyOrderDatabase,
    P: PaymentProcessor,
{
    /// Places a buy order for the customer.
    ///
    /// The full target price is authorized on the customer's payment method and held until the order is fulfilled,
    /// cancelled or expires. The buy order is only written once the processor confirms that the funds are held
    /// (`requires_capture`). Any other outcome fails with [`BuyOrderError::PaymentAuthorizationFailed`] and leaves no
    /// buy order behind.
    ///
    /// If the merchant has an active discount that the new order qualifies for, the order is fulfilled immediately.
    pub async fn create_buy_order(
        &self,
        customer_id: i64,
        request: NewBuyOrderRequest,
    ) -> Result<PlacedOrder, BuyOrderError> {
        if !request.target_price.is_positive() {
            return Err(BuyOrderError::InvalidTargetPrice("The target price must be greater than zero".into()));
        }
        let product =
            self.db.fetch_product(request.product_id).await?.ok_or(BuyOrderError::ProductNotFound(request.product_id))?;
        if request.target_price >= product.current_price {
            return Err(BuyOrderError::InvalidTargetPrice(format!(
                "The target price {} must be below the current price of {}",
                request.target_price, product.current_price
            )));
        }
        let days = request.expires_in_days.unwrap_or(self.options.default_expiry_days);
        if days < 1 || days > self.options.max_expiry_days {
            return Err(BuyOrderError::InvalidExpiry(format!(
                "Buy orders must expire within 1 to {} days",
                self.options.max_expiry_days
            )));
        }
        let merchant =
            self.db.fetch_merchant(product.merchant_id).await?.ok_or(BuyOrderError::MerchantNotFound(product.merchant_id))?;
        let destination_account = match merchant.stripe_account_id.as_deref() {
            Some(account) if merchant.can_accept_payments() => account.to_string(),
            _ => return Err(BuyOrderError::MerchantPaymentsNotEnabled(merchant.id)),
        };
        let customer = self.db.fetch_customer(customer_id).await?.ok_or(BuyOrderError::CustomerNotFound(customer_id))?;
        let payment_method = request.payment_method.trim();
        if payment_method.is_empty() {
            return Err(BuyOrderError::MissingPaymentMethod);
        }

        let split = FeeSplit::compute(request.target_price, self.options.fee_rate_bps);
        let entry =
            self.db.open_ledger_entry(NewLedgerEntry::new(LedgerAction::Authorize, split.amount, split.platform_fee)).await?;
        let mut metadata = BTreeMap::new();
        metadata.insert("product_id".to_string(), product.id.to_string());
        metadata.insert("customer_id".to_string(), customer.id.to_string());
        metadata.insert("merchant_id".to_string(), merchant.id.to_string());
        metadata.insert("target_price".to_string(), request.target_price.value().to_string());
        let hold = HoldRequest {
            amount: split.amount,
            platform_fee: split.platform_fee,
            currency: self.options.currency.clone(),
            payment_method: payment_method.to_string(),
            destination_account,
            description: Some(format!("Buy order for {} at {}", product.title, request.target_price)),
            metadata,
            ledger_entry_id: entry.id,
            idempotency_key: entry.idempotency_key.clone(),
        };
        debug!("🔄️💳️ Requesting a hold of {} for customer #{customer_id} on product #{}", split.amount, product.id);
        let intent = match self.processor.create_hold(hold).await {
            Ok(intent) => intent,
            Err(e @ ProcessorError::Unavailable(_)) => {
                // The hold may have been placed anyway. The reconciler looks it up by ledger entry and releases it.
                warn!(
                    "🔄️💳️ No answer to the hold for customer #{customer_id} on product #{}. Ledger entry #{} stays \
                     pending. {e}",
                    product.id, entry.id
                );
                return Err(BuyOrderError::PaymentProcessorError(e.to_string()));
            },
            Err(e) => {
                warn!("🔄️💳️ Hold for customer #{customer_id} on product #{} failed. {e}", product.id);
                self.fail_entry(entry.id, &e.to_string()).await;
                return Err(match e {
                    ProcessorError::Declined(_) => BuyOrderError::PaymentAuthorizationFailed {
                        status: IntentStatus::RequiresPaymentMethod.to_string(),
                    },
                    e => BuyOrderError::PaymentProcessorError(e.to_string()),
                });
            },
        };
        if let Err(e) = self.db.attach_intent_to_ledger(entry.id, &intent.id).await {
            error!("🔄️💳️ Could not record payment intent {} on ledger entry #{}. {e}", intent.id, entry.id);
            self.void_hold(&intent, &entry).await;
            return Err(e);
        }
        if intent.status != IntentStatus::RequiresCapture {
            warn!(
                "🔄️💳️ Payment intent {} came back as {} instead of requires_capture. No buy order will be created",
                intent.id, intent.status
            );
            self.void_hold(&intent, &entry).await;
            self.fail_entry(entry.id, &format!("Authorization ended in state {}", intent.status)).await;
            return Err(BuyOrderError::PaymentAuthorizationFailed { status: intent.status.to_string() });
        }

        let new_order = NewBuyOrder {
            customer_id: customer.id,
            merchant_id: merchant.id,
            product_id: product.id,
            target_price: request.target_price,
            current_price: product.current_price,
            expires_at: Utc::now() + Duration::days(days),
            terms: EscrowTerms::new(&intent.id, split),
        };
        let (order, escrow) = match self.db.insert_buy_order(entry.id, new_order).await {
            Ok(saved) => saved,
            Err(e) => {
                error!("🔄️ Could not save buy order for payment intent {}. Releasing the hold. {e}", intent.id);
                self.void_hold(&intent, &entry).await;
                self.fail_entry(entry.id, &format!("Buy order could not be saved: {e}")).await;
                return Err(e);
            },
        };
        info!(
            "🔄️📦️ Buy order #{} placed by customer #{} for product #{} at {}. {} held",
            order.id, order.customer_id, order.product_id, order.target_price, escrow.escrow_amount
        );

        let created = NewNotification {
            recipient: Recipient::customer(customer.id),
            kind: NotificationKind::OrderCreated,
            title: "Buy order placed".into(),
            message: format!(
                "Your buy order for {} at {} is active. {} is being held on your card until the price drops or the \
                 order expires on {}.",
                product.title,
                order.target_price,
                escrow.escrow_amount,
                order.expires_at.format("%Y-%m-%d")
            ),
            buy_order_id: Some(order.id),
        };
        self.notify(created, Some(customer.email.clone())).await;
        let received = NewNotification {
            recipient: Recipient::merchant(merchant.id),
            kind: NotificationKind::OrderReceived,
            title: "New buy order".into(),
            message: format!(
                "A customer will buy {} as soon as the price reaches {}. The current price is {}.",
                product.title, order.target_price, product.current_price
            ),
            buy_order_id: Some(order.id),
        };
        self.notify(received, Some(merchant.email.clone())).await;
        self.call_order_created_hook(&order, &escrow).await;

        match self.apply_standing_discount(&order).await {
            Some((order, escrow)) => Ok(PlacedOrder { order, escrow }),
            None => Ok(PlacedOrder { order, escrow }),
        }
    }

    /// Sets a new current price for the product and fulfills every buy order that the new price satisfies.
    ///
    /// Orders are fulfilled one at a time at the new price, highest target first and then oldest first. A failure to
    /// fulfill one order is recorded in the report and does not stop the others. Price alerts that the new price
    /// satisfies are triggered afterwards.
    pub async fn process_price_change(
        &self,
        product_id: i64,
        new_price: Cents,
        source: PriceChangeSource,
    ) -> Result<PriceChangeReport, BuyOrderError> {
        if !new_price.is_positive() {
            return Err(BuyOrderError::InvalidPrice(format!("{new_price} is not a valid product price")));
        }
        let change = self.db.update_product_price(product_id, new_price, source).await?;
        if change.is_drop() {
            info!("🔄️📉️ Product #{product_id} dropped from {} to {new_price}", change.old_price);
        }
        let mut report = PriceChangeReport {
            product: change.product.clone(),
            old_price: change.old_price,
            new_price,
            fulfilled: vec![],
            failures: vec![],
            alerts: vec![],
        };
        let candidates = self.db.fulfillable_orders(product_id, new_price).await?;
        trace!("🔄️📉️ {} buy orders can be fulfilled at {new_price}", candidates.len());
        for order in candidates {
            match self.fulfill_order(&order, new_price).await {
                Ok((order, _)) => report.fulfilled.push(order),
                Err(e) => {
                    warn!("🔄️📉️ Could not fulfill buy order #{} at {new_price}. {e}", order.id);
                    report.failures.push(OrderFailure::new(order.id, e));
                },
            }
        }
        report.alerts = self.trigger_alerts(&change.product).await?;
        debug!(
            "🔄️📉️ Price change for product #{product_id} processed. {} fulfilled, {} failed, {} alerts triggered",
            report.fulfilled.len(),
            report.failures.len(),
            report.alerts.len()
        );
        Ok(report)
    }

    /// Captures the order's hold at `price` and marks the order as fulfilled.
    ///
    /// `price` may be anything up to the target price. Only `price` is captured, the platform fee is recomputed on the
    /// captured amount, and the rest of the hold goes back to the customer.
    pub async fn fulfill_order(
        &self,
        order: &BuyOrder,
        price: Cents,
    ) -> Result<(BuyOrder, EscrowPayment), BuyOrderError> {
        if order.status != BuyOrderStatus::Monitoring {
            return Err(BuyOrderError::OrderNotMonitoring(order.id, order.status));
        }
        if !price.is_positive() || price > order.target_price {
            return Err(BuyOrderError::InvalidPrice(format!(
                "Buy order #{} cannot be fulfilled at {price}. The target price is {}",
                order.id, order.target_price
            )));
        }
        let split = FeeSplit::compute(price, order.terms().fee_rate_bps);
        let intent_id = order.payment_intent_id();
        let entry = NewLedgerEntry::new(LedgerAction::Capture, split.amount, split.platform_fee)
            .for_order(order.id, intent_id);
        let entry = self.db.open_ledger_entry(entry).await?;
        debug!("🔄️💳️ Capturing {} (fee {}) on {intent_id} for buy order #{}", split.amount, split.platform_fee, order.id);
        let intent = match self.processor.capture(intent_id, split.amount, split.platform_fee, &entry.idempotency_key).await
        {
            Ok(intent) => intent,
            Err(e) => {
                warn!("🔄️💳️ Capture of {intent_id} failed. Checking the intent at the processor. {e}");
                self.resolve_after_error(&entry, intent_id, IntentStatus::Succeeded, e).await?
            },
        };
        match intent.status {
            IntentStatus::Succeeded => {},
            IntentStatus::Processing | IntentStatus::Unknown => {
                return Err(BuyOrderError::PaymentProcessorError(format!(
                    "The capture of {intent_id} is still {}. It will be reconciled later",
                    intent.status
                )));
            },
            IntentStatus::Canceled => {
                warn!("🔄️💳️ The hold for buy order #{} has lapsed at the processor", order.id);
                self.fail_entry(entry.id, "The hold was cancelled at the processor").await;
                self.reconcile_intent(&intent).await?;
                return Err(BuyOrderError::PaymentProcessorError(format!("The hold on {intent_id} is no longer valid")));
            },
            other => {
                self.fail_entry(entry.id, &format!("Capture left the intent in state {other}")).await;
                return Err(BuyOrderError::PaymentProcessorError(format!(
                    "Capture left payment intent {intent_id} in state {other}"
                )));
            },
        }
        match self.settle_fulfillment(entry.id).await {
            Err(BuyOrderError::LedgerEntryNotPending(_)) => {
                debug!("🔄️ Ledger entry #{} was settled concurrently", entry.id);
                self.current_state(order.id).await
            },
            result => result,
        }
    }

    /// Cancels a monitoring buy order on behalf of its customer, the merchant that owns the product, or an admin.
    /// The hold is released in full.
    pub async fn cancel_buy_order(&self, order_id: i64, actor: Actor) -> Result<BuyOrder, BuyOrderError> {
        let order = self.db.fetch_buy_order(order_id).await?.ok_or(BuyOrderError::OrderNotFound(order_id))?;
        match actor {
            Actor::Customer(id) if id != order.customer_id => return Err(BuyOrderError::NotOrderOwner(order_id)),
            Actor::Merchant(id) if id != order.merchant_id => return Err(BuyOrderError::NotOrderOwner(order_id)),
            _ => {},
        }
        match order.status {
            BuyOrderStatus::Monitoring => {},
            BuyOrderStatus::Cancelled => return Err(BuyOrderError::OrderModificationNoOp),
            status => {
                return Err(BuyOrderError::OrderModificationForbidden(format!(
                    "Buy order #{order_id} is {status} and can no longer be cancelled"
                )))
            },
        }
        let (order, _) = self.annul_order(&order, BuyOrderStatus::Cancelled).await?;
        info!("🔄️❌️ Buy order #{order_id} cancelled by {actor:?}");
        Ok(order)
    }

    /// Releases the holds of every monitoring order that has passed its expiry time, and marks lapsed discounts as
    /// expired.
    pub async fn expire_due_orders(&self) -> Result<ExpiryReport, BuyOrderError> {
        let mut report = ExpiryReport::default();
        let due = self.db.orders_due_for_expiry().await?;
        if !due.is_empty() {
            debug!("🔄️⏰️ {} buy orders are due to expire", due.len());
        }
        for order in due {
            match self.annul_order(&order, BuyOrderStatus::Expired).await {
                Ok((order, _)) => report.expired.push(order),
                Err(e) => {
                    warn!("🔄️⏰️ Could not expire buy order #{}. {e}", order.id);
                    report.failures.push(OrderFailure::new(order.id, e));
                },
            }
        }
        report.discounts_expired = self.db.expire_lapsed_discounts().await?;
        Ok(report)
    }

    /// Stores a new discount and fulfills every waiting buy order that it applies to, while uses remain.
    ///
    /// The discount stays active for orders placed later, until it runs out of uses or expires.
    pub async fn issue_discount(
        &self,
        merchant_id: i64,
        discount: NewDiscount,
    ) -> Result<DiscountReport, BuyOrderError> {
        let product = self
            .db
            .fetch_product(discount.product_id)
            .await?
            .ok_or(BuyOrderError::ProductNotFound(discount.product_id))?;
        if product.merchant_id != merchant_id {
            return Err(BuyOrderError::NotProductOwner(product.id));
        }
        if !discount.discount_price.is_positive() {
            return Err(BuyOrderError::InvalidDiscount("The discount price must be greater than zero".into()));
        }
        if discount.max_uses.is_some_and(|n| n < 1) {
            return Err(BuyOrderError::InvalidDiscount("A discount must allow at least one use".into()));
        }
        if discount.expires_at.is_some_and(|t| t <= Utc::now()) {
            return Err(BuyOrderError::InvalidDiscount("The discount has already expired".into()));
        }
        let discount = self.db.insert_discount(merchant_id, discount).await?;
        info!(
            "🔄️🏷️ Merchant #{merchant_id} issued discount #{} on product #{} at {}",
            discount.id, product.id, discount.discount_price
        );
        let candidates = self.db.fulfillable_orders(product.id, discount.discount_price).await?;
        let mut fulfilled = vec![];
        let mut failures = vec![];
        for order in candidates.iter().filter(|o| discount.applies_to(o)) {
            match self.fulfill_with_discount(&discount, order).await {
                Ok(Some((order, _))) => fulfilled.push(order),
                Ok(None) => {
                    debug!("🔄️🏷️ Discount #{} has no uses left", discount.id);
                    break;
                },
                Err(e) => {
                    warn!("🔄️🏷️ Could not fulfill buy order #{} with discount #{}. {e}", order.id, discount.id);
                    failures.push(OrderFailure::new(order.id, e));
                },
            }
        }
        let discount = self.db.fetch_discount(discount.id).await?.unwrap_or(discount);
        Ok(DiscountReport { discount, fulfilled, failures })
    }

    /// Applies the processor's view of a payment intent to the ledger.
    ///
    /// Pending ledger entries for the intent are settled or failed according to the intent's status. Afterwards, a
    /// monitoring order whose intent was captured or cancelled outside of this flow (for example, the hold lapsed at
    /// the processor) is brought in line with the processor.
    ///
    /// A hold without a buy order is only released once its authorize entry is older than
    /// [`FlowOptions::orphan_grace`], since the order may still be on its way.
    pub async fn reconcile_intent(&self, intent: &IntentInfo) -> Result<ReconcileReport, BuyOrderError> {
        self.reconcile_intent_after(intent, self.options.orphan_grace).await
    }

    async fn reconcile_intent_after(
        &self,
        intent: &IntentInfo,
        orphan_after: Duration,
    ) -> Result<ReconcileReport, BuyOrderError> {
        let mut report = ReconcileReport::default();
        self.claim_lost_hold(intent).await?;
        for entry in self.db.pending_ledger_for_intent(&intent.id).await? {
            match self.reconcile_entry(&entry, intent, orphan_after).await {
                Ok(r) => report.merge(r),
                Err(e) => warn!("🔄️🧾️ Could not reconcile ledger entry #{} against {}. {e}", entry.id, intent.id),
            }
        }
        if let Some(order) = self.adopt_processor_outcome(intent).await? {
            report.orders.push(order);
        }
        if !report.is_empty() {
            info!(
                "🔄️🧾️ Reconciled {} against the processor ({}). {} entries resolved, {} orders updated",
                intent.id,
                intent.status,
                report.resolved.len(),
                report.orders.len()
            );
        }
        Ok(report)
    }

    /// Resolves ledger entries that have been pending for longer than `older_than` by asking the processor what
    /// happened to them.
    pub async fn reconcile_stale_ledger(&self, older_than: Duration) -> Result<ReconcileReport, BuyOrderError> {
        let mut report = ReconcileReport::default();
        let mut checked = HashSet::new();
        for entry in self.db.stale_pending_ledger(older_than).await? {
            match entry.payment_intent_id.as_deref() {
                None if entry.action == LedgerAction::Authorize => match self.processor.find_hold(entry.id).await {
                    Ok(Some(intent)) => {
                        if checked.insert(intent.id.clone()) {
                            report.merge(self.reconcile_intent_after(&intent, older_than).await?);
                        }
                    },
                    Ok(None) => {
                        warn!("🔄️🧾️ Ledger entry #{} never received a processor response", entry.id);
                        self.db.fail_ledger_entry(entry.id, "abandoned before processor response").await?;
                        report.resolved.push(entry.id);
                    },
                    Err(e) => warn!("🔄️🧾️ Could not look up the hold for ledger entry #{}. {e}", entry.id),
                },
                None => {
                    warn!("🔄️🧾️ Ledger entry #{} never received a processor response", entry.id);
                    self.db.fail_ledger_entry(entry.id, "abandoned before processor response").await?;
                    report.resolved.push(entry.id);
                },
                Some(intent_id) if checked.insert(intent_id.to_string()) => {
                    match self.processor.retrieve(intent_id).await {
                        Ok(intent) => report.merge(self.reconcile_intent_after(&intent, older_than).await?),
                        Err(e) => warn!("🔄️🧾️ Could not retrieve {intent_id} for ledger entry #{}. {e}", entry.id),
                    }
                },
                Some(_) => {},
            }
        }
        Ok(report)
    }

    pub async fn fetch_buy_order(&self, id: i64) -> Result<Option<BuyOrder>, BuyOrderError> {
        self.db.fetch_buy_order(id).await
    }

    pub async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<BuyOrder>, BuyOrderError> {
        self.db.orders_for_customer(customer_id).await
    }

    pub async fn orders_for_merchant(
        &self,
        merchant_id: i64,
        status: Option<BuyOrderStatus>,
    ) -> Result<Vec<BuyOrder>, BuyOrderError> {
        self.db.orders_for_merchant(merchant_id, status).await
    }

    pub async fn escrow_for_order(&self, buy_order_id: i64) -> Result<Option<EscrowPayment>, BuyOrderError> {
        self.db.fetch_escrow_for_order(buy_order_id).await
    }

    pub async fn ledger_for_order(&self, buy_order_id: i64) -> Result<Vec<LedgerEntry>, BuyOrderError> {
        self.db.ledger_for_order(buy_order_id).await
    }

    pub async fn discounts_for_merchant(&self, merchant_id: i64) -> Result<Vec<MerchantDiscount>, BuyOrderError> {
        self.db.discounts_for_merchant(merchant_id).await
    }

    //---------------------------------------   Private methods   ------------------------------------------------------

    /// Releases the order's hold in full and moves it to `status` (cancelled or expired).
    async fn annul_order(
        &self,
        order: &BuyOrder,
        status: BuyOrderStatus,
    ) -> Result<(BuyOrder, EscrowPayment), BuyOrderError> {
        let intent_id = order.payment_intent_id();
        let entry = NewLedgerEntry::new(LedgerAction::Cancel, order.terms().escrow_amount, Cents::default())
            .for_order(order.id, intent_id)
            .resolving_to(status);
        let entry = self.db.open_ledger_entry(entry).await?;
        debug!("🔄️💳️ Releasing the hold on {intent_id} for buy order #{} ({status})", order.id);
        let intent = match self.processor.cancel(intent_id, &entry.idempotency_key).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!("🔄️💳️ Cancelling {intent_id} failed. Checking the intent at the processor. {e}");
                self.resolve_after_error(&entry, intent_id, IntentStatus::Canceled, e).await?
            },
        };
        match intent.status {
            IntentStatus::Canceled => {},
            IntentStatus::Processing | IntentStatus::Unknown => {
                return Err(BuyOrderError::PaymentProcessorError(format!(
                    "The release of {intent_id} is still {}. It will be reconciled later",
                    intent.status
                )));
            },
            IntentStatus::Succeeded => {
                error!("🔄️💳️ {intent_id} was captured while buy order #{} was being released", order.id);
                self.fail_entry(entry.id, "The intent had already been captured").await;
                self.reconcile_intent(&intent).await?;
                return Err(BuyOrderError::InconsistentEscrowState(format!(
                    "Payment intent {intent_id} has already been captured"
                )));
            },
            other => {
                self.fail_entry(entry.id, &format!("Cancel left the intent in state {other}")).await;
                return Err(BuyOrderError::PaymentProcessorError(format!(
                    "Cancel left payment intent {intent_id} in state {other}"
                )));
            },
        }
        match self.settle_annulment(entry.id).await {
            Err(BuyOrderError::LedgerEntryNotPending(_)) => {
                debug!("🔄️ Ledger entry #{} was settled concurrently", entry.id);
                self.current_state(order.id).await
            },
            result => result,
        }
    }

    /// After a processor call returned an error, looks up the intent to find out whether the call took effect anyway.
    /// Returns the intent if it reached `expected`. Otherwise the entry is failed, unless the processor could not be
    /// reached at all, in which case the entry stays pending for the reconciler.
    async fn resolve_after_error(
        &self,
        entry: &LedgerEntry,
        intent_id: &str,
        expected: IntentStatus,
        err: ProcessorError,
    ) -> Result<IntentInfo, BuyOrderError> {
        match self.processor.retrieve(intent_id).await {
            Ok(intent) if intent.status == expected => Ok(intent),
            Ok(intent) => {
                self.fail_entry(entry.id, &err.to_string()).await;
                if intent.status == IntentStatus::Canceled {
                    self.reconcile_intent(&intent).await?;
                }
                Err(BuyOrderError::PaymentProcessorError(err.to_string()))
            },
            Err(e) => {
                warn!("🔄️💳️ {intent_id} could not be retrieved either. Ledger entry #{} stays pending. {e}", entry.id);
                Err(BuyOrderError::PaymentProcessorError(err.to_string()))
            },
        }
    }

    /// Records a hold on the authorize entry it was placed for, when the response to `create_hold` never arrived.
    async fn claim_lost_hold(&self, intent: &IntentInfo) -> Result<(), BuyOrderError> {
        let Some(ledger_id) = intent.ledger_entry_id else {
            return Ok(());
        };
        let Some(entry) = self.db.fetch_ledger_entry(ledger_id).await? else {
            return Ok(());
        };
        let unclaimed = entry.action == LedgerAction::Authorize &&
            entry.state == LedgerState::Pending &&
            entry.payment_intent_id.is_none();
        if !unclaimed {
            return Ok(());
        }
        info!("🔄️🧾️ Found hold {} for ledger entry #{ledger_id}", intent.id);
        match self.db.attach_intent_to_ledger(ledger_id, &intent.id).await {
            Ok(_) | Err(BuyOrderError::LedgerEntryNotPending(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn reconcile_entry(
        &self,
        entry: &LedgerEntry,
        intent: &IntentInfo,
        orphan_after: Duration,
    ) -> Result<ReconcileReport, BuyOrderError> {
        let mut report = ReconcileReport::default();
        let status = intent.status;
        if matches!(status, IntentStatus::Processing | IntentStatus::Unknown) {
            trace!("🔄️🧾️ {} is still {status}. Ledger entry #{} stays pending", intent.id, entry.id);
            return Ok(report);
        }
        if entry.action == LedgerAction::Authorize && Utc::now() - entry.created_at < orphan_after {
            trace!("🔄️🧾️ Ledger entry #{} for {} is too young to be orphaned. It stays pending", entry.id, intent.id);
            return Ok(report);
        }
        match (entry.action, status) {
            (LedgerAction::Authorize, IntentStatus::RequiresCapture) => {
                // No buy order was ever written for this hold, so nothing would ever capture or release it
                warn!("🔄️🧾️ Releasing orphaned hold {} from ledger entry #{}", intent.id, entry.id);
                self.void_hold(intent, entry).await;
                self.db.fail_ledger_entry(entry.id, "Orphaned hold released").await?;
            },
            (LedgerAction::Capture, IntentStatus::Succeeded) => {
                let (order, _) = self.settle_fulfillment(entry.id).await?;
                report.orders.push(order);
            },
            (LedgerAction::Cancel, IntentStatus::Canceled) => {
                let (order, _) = self.settle_annulment(entry.id).await?;
                report.orders.push(order);
            },
            (action, status) => {
                self.db.fail_ledger_entry(entry.id, &format!("{action} ended with the intent in state {status}")).await?;
            },
        }
        report.resolved.push(entry.id);
        Ok(report)
    }

    /// Brings a monitoring order in line with an intent that was captured or cancelled without a ledger entry of our
    /// own, e.g. a hold that lapsed at the processor.
    async fn adopt_processor_outcome(&self, intent: &IntentInfo) -> Result<Option<BuyOrder>, BuyOrderError> {
        if !matches!(intent.status, IntentStatus::Canceled | IntentStatus::Succeeded) {
            return Ok(None);
        }
        let Some(order) = self.db.fetch_buy_order_by_intent(&intent.id).await? else {
            return Ok(None);
        };
        if order.status != BuyOrderStatus::Monitoring {
            return Ok(None);
        }
        let entry = if intent.status == IntentStatus::Canceled {
            NewLedgerEntry::new(LedgerAction::Cancel, order.terms().escrow_amount, Cents::default())
                .resolving_to(BuyOrderStatus::Expired)
        } else {
            let split = FeeSplit::compute(intent.amount_received, order.terms().fee_rate_bps);
            NewLedgerEntry::new(LedgerAction::Capture, split.amount, split.platform_fee)
        };
        let entry = entry.for_order(order.id, &intent.id);
        let entry = match self.db.open_ledger_entry(entry).await {
            Ok(entry) => entry,
            Err(BuyOrderError::EscrowOperationInFlight(_)) | Err(BuyOrderError::OrderNotMonitoring(..)) => {
                return Ok(None)
            },
            Err(e) => return Err(e),
        };
        warn!("🔄️🧾️ Buy order #{} was settled at the processor ({}). Recording the outcome", order.id, intent.status);
        let (order, _) = match intent.status {
            IntentStatus::Canceled => self.settle_annulment(entry.id).await?,
            _ => self.settle_fulfillment(entry.id).await?,
        };
        Ok(Some(order))
    }

    async fn settle_fulfillment(&self, ledger_id: i64) -> Result<(BuyOrder, EscrowPayment), BuyOrderError> {
        let (order, escrow) = self.db.settle_capture(ledger_id).await?;
        let price = order.fulfilled_price.unwrap_or(order.target_price);
        info!("🔄️✅️ Buy order #{} fulfilled at {price}. {} released to the merchant", order.id, escrow.merchant_share);
        let title = self.product_title(order.product_id).await;
        let fulfilled = NewNotification {
            recipient: Recipient::customer(order.customer_id),
            kind: NotificationKind::OrderFulfilled,
            title: "Buy order fulfilled".into(),
            message: format!(
                "Good news! {title} reached your price. You paid {price} against your target of {}.",
                order.target_price
            ),
            buy_order_id: Some(order.id),
        };
        self.notify(fulfilled, self.email_of(RecipientKind::Customer, order.customer_id).await).await;
        let sold = NewNotification {
            recipient: Recipient::merchant(order.merchant_id),
            kind: NotificationKind::OrderSold,
            title: "Buy order fulfilled".into(),
            message: format!(
                "A buy order for {title} was fulfilled at {price}. Your share is {} after a platform fee of {}.",
                escrow.merchant_share, escrow.platform_fee
            ),
            buy_order_id: Some(order.id),
        };
        self.notify(sold, self.email_of(RecipientKind::Merchant, order.merchant_id).await).await;
        self.call_order_fulfilled_hook(&order, &escrow).await;
        Ok((order, escrow))
    }

    async fn settle_annulment(&self, ledger_id: i64) -> Result<(BuyOrder, EscrowPayment), BuyOrderError> {
        let (order, escrow) = self.db.settle_release(ledger_id).await?;
        info!("🔄️↩️ Buy order #{} is {}. {} refunded", order.id, order.status, escrow.escrow_amount);
        let title = self.product_title(order.product_id).await;
        let (kind, heading, reason) = match order.status {
            BuyOrderStatus::Expired => (NotificationKind::OrderExpired, "Buy order expired", "expired"),
            _ => (NotificationKind::OrderCancelled, "Buy order cancelled", "was cancelled"),
        };
        let notification = NewNotification {
            recipient: Recipient::customer(order.customer_id),
            kind,
            title: heading.into(),
            message: format!(
                "Your buy order for {title} at {} {reason}. The hold of {} on your card has been released.",
                order.target_price, escrow.escrow_amount
            ),
            buy_order_id: Some(order.id),
        };
        self.notify(notification, self.email_of(RecipientKind::Customer, order.customer_id).await).await;
        self.call_order_annulled_hook(&order).await;
        Ok((order, escrow))
    }

    /// Looks for an active discount that a freshly placed order qualifies for, and fulfills the order with it.
    async fn apply_standing_discount(&self, order: &BuyOrder) -> Option<(BuyOrder, EscrowPayment)> {
        let discounts = match self.db.active_discounts_for_product(order.product_id).await {
            Ok(d) => d,
            Err(e) => {
                warn!("🔄️🏷️ Could not look up discounts for product #{}. {e}", order.product_id);
                return None;
            },
        };
        let now = Utc::now();
        for discount in discounts.iter().filter(|d| d.is_usable(now) && d.applies_to(order)) {
            match self.fulfill_with_discount(discount, order).await {
                Ok(Some(result)) => {
                    info!("🔄️🏷️ Buy order #{} fulfilled immediately by discount #{}", order.id, discount.id);
                    return Some(result);
                },
                Ok(None) => continue,
                Err(e) => {
                    warn!("🔄️🏷️ Discount #{} could not be applied to buy order #{}. {e}", discount.id, order.id);
                    return None;
                },
            }
        }
        None
    }

    /// Claims a use of the discount and fulfills the order at the discount price. The use is handed back if the
    /// fulfillment fails. Returns `None` if the discount had no uses left.
    async fn fulfill_with_discount(
        &self,
        discount: &MerchantDiscount,
        order: &BuyOrder,
    ) -> Result<Option<(BuyOrder, EscrowPayment)>, BuyOrderError> {
        if self.db.claim_discount_use(discount.id).await?.is_none() {
            return Ok(None);
        }
        match self.fulfill_order(order, discount.discount_price).await {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                if let Err(e) = self.db.release_discount_use(discount.id).await {
                    error!("🔄️🏷️ Could not return a use to discount #{}. {e}", discount.id);
                }
                Err(e)
            },
        }
    }

    async fn trigger_alerts(&self, product: &Product) -> Result<Vec<PriceAlert>, BuyOrderError> {
        let alerts = self.db.trigger_price_alerts(product.id, product.current_price).await?;
        for alert in &alerts {
            let notification = NewNotification {
                recipient: Recipient::customer(alert.customer_id),
                kind: NotificationKind::PriceAlert,
                title: "Price alert".into(),
                message: format!(
                    "{} is now {}, at or below your alert price of {}.",
                    product.title, product.current_price, alert.target_price
                ),
                buy_order_id: None,
            };
            // Alert emails go out through the price alert hook, so no notification event is published here
            if let Err(e) = self.db.insert_notification(notification).await {
                warn!("🔄️🔔️ Could not save the notification for price alert #{}. {e}", alert.id);
            }
            for emitter in &self.producers.price_alert_producer {
                let event = PriceAlertTriggeredEvent { alert: alert.clone(), product: product.clone() };
                emitter.publish_event(event).await;
            }
        }
        Ok(alerts)
    }

    async fn current_state(&self, order_id: i64) -> Result<(BuyOrder, EscrowPayment), BuyOrderError> {
        let order = self.db.fetch_buy_order(order_id).await?.ok_or(BuyOrderError::OrderNotFound(order_id))?;
        let escrow = self.db.fetch_escrow_for_order(order_id).await?.ok_or_else(|| {
            BuyOrderError::InconsistentEscrowState(format!("Buy order #{order_id} has no escrow payment"))
        })?;
        Ok((order, escrow))
    }

    /// Best-effort release of a hold that no buy order will ever refer to.
    async fn void_hold(&self, intent: &IntentInfo, entry: &LedgerEntry) {
        if intent.status == IntentStatus::Canceled {
            return;
        }
        let key = format!("{}-void", entry.idempotency_key);
        if let Err(e) = self.processor.cancel(&intent.id, &key).await {
            error!("🔄️💳️ Could not release hold {}. It will lapse at the processor. {e}", intent.id);
        }
    }

    async fn fail_entry(&self, ledger_id: i64, reason: &str) {
        if let Err(e) = self.db.fail_ledger_entry(ledger_id, reason).await {
            error!("🔄️🧾️ Could not mark ledger entry #{ledger_id} as failed. {e}");
        }
    }

    async fn product_title(&self, product_id: i64) -> String {
        match self.db.fetch_product(product_id).await {
            Ok(Some(p)) => p.title,
            _ => format!("product #{product_id}"),
        }
    }

    async fn email_of(&self, kind: RecipientKind, id: i64) -> Option<String> {
        let result = match kind {
            RecipientKind::Customer => self.db.fetch_customer(id).await.map(|c| c.map(|c| c.email)),
            RecipientKind::Merchant => self.db.fetch_merchant(id).await.map(|m| m.map(|m| m.email)),
        };
        result.unwrap_or_else(|e| {
            warn!("🔄️ Could not look up the email address of {kind} #{id}. {e}");
            None
        })
    }

    /// Saves the in-app notification and publishes it so that it can be emailed. Failures are logged and swallowed;
    /// a notification never undoes a settled payment.
    async fn notify(&self, notification: NewNotification, email: Option<String>) {
        let recipient = notification.recipient;
        let notification = match self.db.insert_notification(notification).await {
            Ok(n) => n,
            Err(e) => {
                warn!("🔄️🔔️ Could not save notification for {} #{}. {e}", recipient.kind, recipient.id);
                return;
            },
        };
        for emitter in &self.producers.notification_producer {
            let event = NotificationEvent { notification: notification.clone(), email: email.clone() };
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_created_hook(&self, order: &BuyOrder, escrow: &EscrowPayment) {
        for emitter in &self.producers.order_created_producer {
            debug!("🔄️📦️ Notifying order created hook subscribers");
            emitter.publish_event(OrderCreatedEvent::new(order.clone(), escrow.clone())).await;
        }
    }

    async fn call_order_fulfilled_hook(&self, order: &BuyOrder, escrow: &EscrowPayment) {
        for emitter in &self.producers.order_fulfilled_producer {
            debug!("🔄️📦️ Notifying order fulfilled hook subscribers");
            emitter.publish_event(OrderFulfilledEvent::new(order.clone(), escrow.clone())).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &BuyOrder) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("🔄️📦️ Notifying order annulled hook subscribers");
            emitter.publish_event(OrderAnnulledEvent::new(order.clone())).await;
        }
    }
}
