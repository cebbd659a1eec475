//! #  Backend contracts
//!
//! This module defines the behaviour that storage backends and payment processors need to expose in order to be
//! driven by the buy order engine.
//!
//! ## Buy orders and escrow
//! A buy order is a standing offer from a customer to purchase a product at or below a target price. The full target
//! amount is authorized on the customer's card up front and held until the order is fulfilled, cancelled or expires.
//!
//! The [`BuyOrderDatabase`] trait provides the atomic state transitions that keep buy orders, escrow payments and the
//! escrow ledger consistent with one another. The [`PaymentProcessor`] trait abstracts the card processor that
//! actually places, captures and releases the holds.
//!
//! ## Traits
//! * [`BuyOrderDatabase`] defines the highest level of behaviour: order placement, price changes and escrow settlement.
//! * [`AccountManagement`] registers and looks up customers and merchants.
//! * [`CatalogManagement`] maintains the product catalog and its price history.
//! * [`NotificationManagement`] stores in-app notifications and the outbound email log.
//! * [`PriceAlertManagement`] manages hold-free price alerts.
//! * [`IntegrationManagement`] tracks merchant storefront connections.
//! * [`MerchantAnalytics`] provides read-only reporting queries.
//! * [`PaymentProcessor`] places and settles escrow holds with the card processor.
mod account_management;
mod buy_order_database;
mod catalog_management;
mod data_objects;
mod integration_management;
mod merchant_analytics;
mod notification_management;
mod payment_processor;
mod price_alert_management;

pub use account_management::{AccountApiError, AccountManagement};
pub use buy_order_database::{BuyOrderDatabase, BuyOrderError};
pub use catalog_management::{CatalogApiError, CatalogManagement};
pub use data_objects::{MerchantSummary, PriceChange, ProductDemand, ProductUpsert, StatusCount};
pub use integration_management::{IntegrationApiError, IntegrationManagement};
pub use merchant_analytics::{AnalyticsError, EscrowTotals, MerchantAnalytics};
pub use notification_management::{NotificationApiError, NotificationManagement};
pub use payment_processor::{
    HoldRequest, IntentInfo, IntentStatus, PaymentProcessor, ProcessorError, LEDGER_ENTRY_METADATA_KEY,
};
pub use price_alert_management::{PriceAlertError, PriceAlertManagement};
