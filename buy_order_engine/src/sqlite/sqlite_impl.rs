//! `SqliteDatabase` is a concrete implementation of a buy order engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use bo_common::Cents;
use chrono::Duration;
use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{
    accounts,
    analytics,
    buy_orders,
    db_url,
    discounts,
    escrow,
    integrations,
    is_unique_violation,
    ledger,
    new_pool,
    notifications,
    price_alerts,
    products,
};
use crate::{
    db_types::{
        BuyOrder,
        BuyOrderStatus,
        Customer,
        EmailLog,
        EscrowPayment,
        Integration,
        LedgerAction,
        LedgerEntry,
        LedgerState,
        Merchant,
        MerchantDiscount,
        NewAccount,
        NewBuyOrder,
        NewDiscount,
        NewEmailLog,
        NewIntegration,
        NewLedgerEntry,
        NewNotification,
        NewPriceAlert,
        NewProduct,
        Notification,
        Platform,
        PriceAlert,
        PriceChangeSource,
        PriceHistory,
        Product,
        ProductSource,
        Recipient,
    },
    traits::{
        AccountApiError,
        AccountManagement,
        AnalyticsError,
        BuyOrderDatabase,
        BuyOrderError,
        CatalogApiError,
        CatalogManagement,
        EscrowTotals,
        IntegrationApiError,
        IntegrationManagement,
        MerchantAnalytics,
        NotificationApiError,
        NotificationManagement,
        PriceAlertError,
        PriceAlertManagement,
        PriceChange,
        ProductDemand,
        ProductUpsert,
        StatusCount,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl BuyOrderDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_buy_order(&self, id: i64) -> Result<Option<BuyOrder>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(buy_orders::fetch_buy_order(id, &mut conn).await?)
    }

    async fn fetch_buy_order_by_intent(&self, payment_intent_id: &str) -> Result<Option<BuyOrder>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(buy_orders::fetch_by_intent(payment_intent_id, &mut conn).await?)
    }

    async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<BuyOrder>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(buy_orders::search_orders(Some(customer_id), None, None, &mut conn).await?)
    }

    async fn orders_for_merchant(
        &self,
        merchant_id: i64,
        status: Option<BuyOrderStatus>,
    ) -> Result<Vec<BuyOrder>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(buy_orders::search_orders(None, Some(merchant_id), status, &mut conn).await?)
    }

    async fn fetch_escrow_for_order(&self, buy_order_id: i64) -> Result<Option<EscrowPayment>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(escrow::fetch_for_order(buy_order_id, &mut conn).await?)
    }

    async fn ledger_for_order(&self, buy_order_id: i64) -> Result<Vec<LedgerEntry>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledger::entries_for_order(buy_order_id, &mut conn).await?)
    }

    async fn open_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, BuyOrderError> {
        let mut tx = self.pool.begin().await?;
        if let Some(order_id) = entry.buy_order_id {
            let order =
                buy_orders::fetch_buy_order(order_id, &mut tx).await?.ok_or(BuyOrderError::OrderNotFound(order_id))?;
            if order.status != BuyOrderStatus::Monitoring {
                return Err(BuyOrderError::OrderNotMonitoring(order_id, order.status));
            }
        }
        let order_id = entry.buy_order_id;
        let action = entry.action;
        let entry = ledger::insert_entry(entry, &mut tx).await.map_err(|e| match order_id {
            Some(id) if is_unique_violation(&e) => BuyOrderError::EscrowOperationInFlight(id),
            _ => BuyOrderError::from(e),
        })?;
        tx.commit().await?;
        debug!("🗃️ Ledger entry #{} opened: {action} {} [{}]", entry.id, entry.amount, entry.idempotency_key);
        Ok(entry)
    }

    async fn fetch_ledger_entry(&self, ledger_id: i64) -> Result<Option<LedgerEntry>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledger::fetch_entry(ledger_id, &mut conn).await?)
    }

    async fn attach_intent_to_ledger(
        &self,
        ledger_id: i64,
        payment_intent_id: &str,
    ) -> Result<LedgerEntry, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        ledger::set_intent(ledger_id, payment_intent_id, &mut conn)
            .await?
            .ok_or(BuyOrderError::LedgerEntryNotPending(ledger_id))
    }

    async fn fail_ledger_entry(&self, ledger_id: i64, reason: &str) -> Result<LedgerEntry, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        let entry = ledger::settle_entry(ledger_id, LedgerState::Failed, None, Some(reason), &mut conn)
            .await?
            .ok_or(BuyOrderError::LedgerEntryNotPending(ledger_id))?;
        debug!("🗃️ Ledger entry #{ledger_id} marked as failed. {reason}");
        Ok(entry)
    }

    async fn pending_ledger_for_intent(&self, payment_intent_id: &str) -> Result<Vec<LedgerEntry>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledger::pending_for_intent(payment_intent_id, &mut conn).await?)
    }

    async fn stale_pending_ledger(&self, older_than: Duration) -> Result<Vec<LedgerEntry>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledger::stale_pending(older_than.num_seconds(), &mut conn).await?)
    }

    async fn insert_buy_order(
        &self,
        ledger_id: i64,
        order: NewBuyOrder,
    ) -> Result<(BuyOrder, EscrowPayment), BuyOrderError> {
        let mut tx = self.pool.begin().await?;
        let entry = pending_entry(ledger_id, LedgerAction::Authorize, &mut tx).await?;
        if entry.payment_intent_id.as_deref() != Some(order.terms.payment_intent_id.as_str()) {
            return Err(BuyOrderError::InconsistentEscrowState(format!(
                "Ledger entry #{ledger_id} does not refer to payment intent {}",
                order.terms.payment_intent_id
            )));
        }
        let terms = order.terms.clone();
        let order = buy_orders::insert_buy_order(order, &mut tx).await?;
        let escrow = escrow::insert_escrow(order.id, &terms, &mut tx).await?;
        ledger::settle_entry(ledger_id, LedgerState::Succeeded, Some(order.id), None, &mut tx)
            .await?
            .ok_or(BuyOrderError::LedgerEntryNotPending(ledger_id))?;
        tx.commit().await?;
        debug!("🗃️ Buy order #{} and escrow #{} saved. Ledger #{ledger_id} settled", order.id, escrow.id);
        Ok((order, escrow))
    }

    async fn settle_capture(&self, ledger_id: i64) -> Result<(BuyOrder, EscrowPayment), BuyOrderError> {
        let mut tx = self.pool.begin().await?;
        let entry = pending_entry(ledger_id, LedgerAction::Capture, &mut tx).await?;
        let order_id = order_for_entry(&entry)?;
        let order = buy_orders::close_monitoring_order(order_id, BuyOrderStatus::Fulfilled, Some(entry.amount), &mut tx)
            .await?
            .ok_or_else(|| not_monitoring(order_id))?;
        let escrow = escrow::release(order_id, entry.amount, entry.platform_fee, &mut tx)
            .await?
            .ok_or_else(|| BuyOrderError::InconsistentEscrowState(format!("Escrow for order #{order_id} is not held")))?;
        ledger::settle_entry(ledger_id, LedgerState::Succeeded, None, None, &mut tx)
            .await?
            .ok_or(BuyOrderError::LedgerEntryNotPending(ledger_id))?;
        tx.commit().await?;
        debug!("🗃️ Buy order #{order_id} fulfilled at {}. Escrow released", entry.amount);
        Ok((order, escrow))
    }

    async fn settle_release(&self, ledger_id: i64) -> Result<(BuyOrder, EscrowPayment), BuyOrderError> {
        let mut tx = self.pool.begin().await?;
        let entry = pending_entry(ledger_id, LedgerAction::Cancel, &mut tx).await?;
        let order_id = order_for_entry(&entry)?;
        let status = match entry.resolves_to {
            Some(s @ (BuyOrderStatus::Cancelled | BuyOrderStatus::Expired)) => s,
            _ => BuyOrderStatus::Cancelled,
        };
        let order = buy_orders::close_monitoring_order(order_id, status, None, &mut tx)
            .await?
            .ok_or_else(|| not_monitoring(order_id))?;
        let escrow = escrow::refund(order_id, &mut tx)
            .await?
            .ok_or_else(|| BuyOrderError::InconsistentEscrowState(format!("Escrow for order #{order_id} is not held")))?;
        ledger::settle_entry(ledger_id, LedgerState::Succeeded, None, None, &mut tx)
            .await?
            .ok_or(BuyOrderError::LedgerEntryNotPending(ledger_id))?;
        tx.commit().await?;
        debug!("🗃️ Buy order #{order_id} is now {status}. Escrow refunded");
        Ok((order, escrow))
    }

    async fn update_product_price(
        &self,
        product_id: i64,
        new_price: Cents,
        source: PriceChangeSource,
    ) -> Result<PriceChange, BuyOrderError> {
        let mut tx = self.pool.begin().await?;
        let product =
            products::fetch_product(product_id, &mut tx).await?.ok_or(BuyOrderError::ProductNotFound(product_id))?;
        let old_price = product.current_price;
        if old_price == new_price {
            trace!("🗃️ Price of product #{product_id} is unchanged at {new_price}");
            return Ok(PriceChange { product, old_price });
        }
        let product = products::set_current_price(product_id, new_price, &mut tx)
            .await?
            .ok_or(BuyOrderError::ProductNotFound(product_id))?;
        products::insert_price_history(product_id, old_price, new_price, source, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Price of product #{product_id} changed from {old_price} to {new_price} ({source})");
        Ok(PriceChange { product, old_price })
    }

    async fn fulfillable_orders(&self, product_id: i64, price: Cents) -> Result<Vec<BuyOrder>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(buy_orders::fulfillable_orders(product_id, price, &mut conn).await?)
    }

    async fn orders_due_for_expiry(&self) -> Result<Vec<BuyOrder>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(buy_orders::due_for_expiry(&mut conn).await?)
    }

    async fn insert_discount(
        &self,
        merchant_id: i64,
        discount: NewDiscount,
    ) -> Result<MerchantDiscount, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        let discount = discounts::insert_discount(merchant_id, discount, &mut conn).await?;
        debug!("🗃️ Discount #{} saved for product #{} at {}", discount.id, discount.product_id, discount.discount_price);
        Ok(discount)
    }

    async fn fetch_discount(&self, id: i64) -> Result<Option<MerchantDiscount>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(discounts::fetch_discount(id, &mut conn).await?)
    }

    async fn active_discounts_for_product(&self, product_id: i64) -> Result<Vec<MerchantDiscount>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(discounts::active_for_product(product_id, &mut conn).await?)
    }

    async fn discounts_for_merchant(&self, merchant_id: i64) -> Result<Vec<MerchantDiscount>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(discounts::discounts_for_merchant(merchant_id, &mut conn).await?)
    }

    async fn claim_discount_use(&self, id: i64) -> Result<Option<MerchantDiscount>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(discounts::claim_use(id, &mut conn).await?)
    }

    async fn release_discount_use(&self, id: i64) -> Result<MerchantDiscount, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        discounts::release_use(id, &mut conn).await?.ok_or(BuyOrderError::DiscountNotFound(id))
    }

    async fn expire_lapsed_discounts(&self) -> Result<u64, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        Ok(discounts::expire_lapsed(&mut conn).await?)
    }

    async fn trigger_price_alerts(&self, product_id: i64, price: Cents) -> Result<Vec<PriceAlert>, BuyOrderError> {
        let mut conn = self.pool.acquire().await?;
        let alerts = price_alerts::trigger_for_price(product_id, price, &mut conn).await?;
        if !alerts.is_empty() {
            debug!("🗃️ {} price alerts triggered for product #{product_id} at {price}", alerts.len());
        }
        Ok(alerts)
    }

    async fn close(&mut self) -> Result<(), BuyOrderError> {
        self.pool.close().await;
        Ok(())
    }
}

async fn pending_entry(
    ledger_id: i64,
    action: LedgerAction,
    conn: &mut sqlx::SqliteConnection,
) -> Result<LedgerEntry, BuyOrderError> {
    let entry = ledger::fetch_entry(ledger_id, conn).await?.ok_or(BuyOrderError::LedgerEntryNotFound(ledger_id))?;
    if entry.state != LedgerState::Pending {
        return Err(BuyOrderError::LedgerEntryNotPending(ledger_id));
    }
    if entry.action != action {
        return Err(BuyOrderError::InconsistentEscrowState(format!(
            "Ledger entry #{ledger_id} is a {} entry, not {action}",
            entry.action
        )));
    }
    Ok(entry)
}

fn order_for_entry(entry: &LedgerEntry) -> Result<i64, BuyOrderError> {
    entry.buy_order_id.ok_or_else(|| {
        BuyOrderError::InconsistentEscrowState(format!("Ledger entry #{} is not linked to a buy order", entry.id))
    })
}

fn not_monitoring(order_id: i64) -> BuyOrderError {
    BuyOrderError::InconsistentEscrowState(format!("Buy order #{order_id} is no longer monitoring"))
}

impl AccountManagement for SqliteDatabase {
    async fn register_customer(&self, account: NewAccount) -> Result<Customer, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let email = account.email.to_lowercase();
        let customer = accounts::insert_customer(account, &mut conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                AccountApiError::EmailAlreadyRegistered(email)
            } else {
                AccountApiError::from(e)
            }
        })?;
        info!("🗃️ Customer #{} registered", customer.id);
        Ok(customer)
    }

    async fn register_merchant(&self, account: NewAccount) -> Result<Merchant, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let email = account.email.to_lowercase();
        let merchant = accounts::insert_merchant(account, &mut conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                AccountApiError::EmailAlreadyRegistered(email)
            } else {
                AccountApiError::from(e)
            }
        })?;
        info!("🗃️ Merchant #{} registered", merchant.id);
        Ok(merchant)
    }

    async fn fetch_customer(&self, id: i64) -> Result<Option<Customer>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(accounts::fetch_customer(id, &mut conn).await?)
    }

    async fn fetch_merchant(&self, id: i64) -> Result<Option<Merchant>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(accounts::fetch_merchant(id, &mut conn).await?)
    }

    async fn fetch_customer_by_email(&self, email: &str) -> Result<Option<(Customer, String)>, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let customer = accounts::fetch_customer_by_email(email, &mut tx).await?;
        let credentials = accounts::customer_credentials(email, &mut tx).await?;
        tx.commit().await?;
        Ok(customer.zip(credentials).map(|(c, creds)| (c, creds.password_hash)))
    }

    async fn fetch_merchant_by_email(&self, email: &str) -> Result<Option<(Merchant, String)>, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let merchant = accounts::fetch_merchant_by_email(email, &mut tx).await?;
        let credentials = accounts::merchant_credentials(email, &mut tx).await?;
        tx.commit().await?;
        Ok(merchant.zip(credentials).map(|(m, creds)| (m, creds.password_hash)))
    }

    async fn set_stripe_account(
        &self,
        merchant_id: i64,
        account_id: &str,
        charges_enabled: bool,
    ) -> Result<Merchant, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = accounts::set_stripe_account(merchant_id, account_id, charges_enabled, &mut conn)
            .await?
            .ok_or(AccountApiError::AccountNotFound)?;
        info!("🗃️ Merchant #{merchant_id} linked to processor account {account_id}. Charges enabled: {charges_enabled}");
        Ok(merchant)
    }

    async fn update_charges_enabled(
        &self,
        account_id: &str,
        charges_enabled: bool,
    ) -> Result<Option<Merchant>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(accounts::set_charges_enabled(account_id, charges_enabled, &mut conn).await?)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn upsert_product(&self, product: NewProduct) -> Result<ProductUpsert, CatalogApiError> {
        let mut tx = self.pool.begin().await?;
        let existing = match product.source_id.as_deref() {
            Some(source_id) => products::find_by_source(product.merchant_id, product.source, source_id, &mut tx).await?,
            None => None,
        };
        let result = match existing {
            Some(existing) => {
                let incoming = product.price;
                let updated = products::update_details(existing.id, &product.title, incoming, &mut tx).await?;
                let pending_price = (updated.current_price != incoming).then_some(incoming);
                ProductUpsert { product: updated, created: false, pending_price }
            },
            None => {
                let inserted = products::insert_product(product, &mut tx).await?;
                ProductUpsert { product: inserted, created: true, pending_price: None }
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(id, &mut conn).await?)
    }

    async fn find_product_by_source(
        &self,
        merchant_id: i64,
        source: ProductSource,
        source_id: &str,
    ) -> Result<Option<Product>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::find_by_source(merchant_id, source, source_id, &mut conn).await?)
    }

    async fn products_for_merchant(&self, merchant_id: i64) -> Result<Vec<Product>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::products_for_merchant(merchant_id, &mut conn).await?)
    }

    async fn price_history(&self, product_id: i64) -> Result<Vec<PriceHistory>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::price_history(product_id, &mut conn).await?)
    }
}

impl NotificationManagement for SqliteDatabase {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, NotificationApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::insert_notification(notification, &mut conn).await?)
    }

    async fn notifications_for(&self, recipient: Recipient) -> Result<Vec<Notification>, NotificationApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::notifications_for(recipient, &mut conn).await?)
    }

    async fn mark_notification_read(
        &self,
        recipient: Recipient,
        id: i64,
    ) -> Result<Notification, NotificationApiError> {
        let mut conn = self.pool.acquire().await?;
        notifications::mark_read(recipient, id, &mut conn).await?.ok_or(NotificationApiError::NotificationNotFound(id))
    }

    async fn insert_email_log(&self, entry: NewEmailLog) -> Result<EmailLog, NotificationApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::insert_email_log(entry, &mut conn).await?)
    }

    async fn email_logs(&self, limit: i64) -> Result<Vec<EmailLog>, NotificationApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::email_logs(limit, &mut conn).await?)
    }
}

impl PriceAlertManagement for SqliteDatabase {
    async fn insert_price_alert(&self, alert: NewPriceAlert) -> Result<PriceAlert, PriceAlertError> {
        let mut conn = self.pool.acquire().await?;
        let alert = price_alerts::insert_alert(alert, &mut conn).await?;
        debug!("🗃️ Price alert #{} saved for product #{} at {}", alert.id, alert.product_id, alert.target_price);
        Ok(alert)
    }

    async fn fetch_price_alert(&self, id: i64) -> Result<Option<PriceAlert>, PriceAlertError> {
        let mut conn = self.pool.acquire().await?;
        Ok(price_alerts::fetch_alert(id, &mut conn).await?)
    }

    async fn alerts_for_customer(&self, customer_id: i64) -> Result<Vec<PriceAlert>, PriceAlertError> {
        let mut conn = self.pool.acquire().await?;
        Ok(price_alerts::alerts_for_customer(customer_id, &mut conn).await?)
    }

    async fn cancel_price_alert(&self, id: i64) -> Result<PriceAlert, PriceAlertError> {
        let mut tx = self.pool.begin().await?;
        let alert = match price_alerts::expire_alert(id, &mut tx).await? {
            Some(alert) => alert,
            None => price_alerts::fetch_alert(id, &mut tx).await?.ok_or(PriceAlertError::AlertNotFound(id))?,
        };
        tx.commit().await?;
        Ok(alert)
    }

    async fn delete_price_alert(&self, id: i64) -> Result<bool, PriceAlertError> {
        let mut conn = self.pool.acquire().await?;
        Ok(price_alerts::delete_alert(id, &mut conn).await?)
    }
}

impl IntegrationManagement for SqliteDatabase {
    async fn upsert_integration(
        &self,
        merchant_id: i64,
        integration: NewIntegration,
    ) -> Result<Integration, IntegrationApiError> {
        let mut conn = self.pool.acquire().await?;
        let domain = integration.shop_domain.clone();
        let integration = integrations::upsert_integration(merchant_id, integration, &mut conn)
            .await?
            .ok_or(IntegrationApiError::ShopAlreadyConnected(domain))?;
        info!("🗃️ Merchant #{merchant_id} connected {} shop {}", integration.platform, integration.shop_domain);
        Ok(integration)
    }

    async fn fetch_integration(&self, id: i64) -> Result<Option<Integration>, IntegrationApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(integrations::fetch_integration(id, &mut conn).await?)
    }

    async fn integrations_for_merchant(&self, merchant_id: i64) -> Result<Vec<Integration>, IntegrationApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(integrations::integrations_for_merchant(merchant_id, &mut conn).await?)
    }

    async fn integration_for_shop(
        &self,
        platform: Platform,
        shop_domain: &str,
    ) -> Result<Option<Integration>, IntegrationApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(integrations::connected_for_shop(platform, shop_domain, &mut conn).await?)
    }

    async fn disconnect_integration(&self, merchant_id: i64, id: i64) -> Result<Integration, IntegrationApiError> {
        let mut conn = self.pool.acquire().await?;
        integrations::disconnect(merchant_id, id, &mut conn).await?.ok_or(IntegrationApiError::IntegrationNotFound(id))
    }

    async fn mark_integration_synced(&self, id: i64) -> Result<Integration, IntegrationApiError> {
        let mut conn = self.pool.acquire().await?;
        integrations::mark_synced(id, &mut conn).await?.ok_or(IntegrationApiError::IntegrationNotFound(id))
    }
}

impl MerchantAnalytics for SqliteDatabase {
    async fn order_status_counts(&self, merchant_id: i64) -> Result<Vec<StatusCount>, AnalyticsError> {
        let mut conn = self.pool.acquire().await?;
        Ok(analytics::status_counts(merchant_id, &mut conn).await?)
    }

    async fn escrow_totals(&self, merchant_id: i64) -> Result<EscrowTotals, AnalyticsError> {
        let mut conn = self.pool.acquire().await?;
        Ok(analytics::escrow_totals(merchant_id, &mut conn).await?)
    }

    async fn product_count(&self, merchant_id: i64) -> Result<i64, AnalyticsError> {
        let mut conn = self.pool.acquire().await?;
        Ok(analytics::product_count(merchant_id, &mut conn).await?)
    }

    async fn product_demand(&self, merchant_id: i64) -> Result<Vec<ProductDemand>, AnalyticsError> {
        let mut conn = self.pool.acquire().await?;
        Ok(analytics::product_demand(merchant_id, &mut conn).await?)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}
