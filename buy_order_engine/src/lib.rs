//! Buy Order Engine
//!
//! The buy order engine lets customers place standing offers to buy a product once its price drops to a target. The
//! target amount is authorized on the customer's card and held in escrow until the order is fulfilled (the hold is
//! captured), cancelled or expires (the hold is released). This library contains the core logic. It is
//! provider-agnostic.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@traits`] and the `sqlite` module). The traits define the atomic state transitions a backend must
//!    provide; [`SqliteDatabase`] is the bundled implementation. You should never need to access the database
//!    directly. The exception is the data types used in the database, which are defined in [`mod@db_types`].
//! 2. The public API (`bo_api`). This provides the buy order flow, accounts, catalog, price alerts, notifications,
//!    analytics and storefront integrations.
//! 3. The [`PaymentProcessor`] seam, which the server implements on top of the card processor's REST API.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain actions
//! occur within the engine. For example, when a buy order is fulfilled, an `OrderFulfilledEvent` is emitted.
//! A simple Actor framework is used so that you can easily hook into these events and perform custom actions.
mod bo_api;

pub mod db_types;
pub mod events;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use bo_api::{
    accounts_api::AccountApi,
    analytics_api::AnalyticsApi,
    buy_order_flow_api::BuyOrderFlowApi,
    catalog_api::CatalogApi,
    integration_api::{normalize_shop_domain, IntegrationApi},
    notification_api::NotificationApi,
    order_objects,
    price_alert_api::PriceAlertApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AccountApiError,
    AccountManagement,
    AnalyticsError,
    BuyOrderDatabase,
    BuyOrderError,
    CatalogApiError,
    CatalogManagement,
    IntegrationApiError,
    IntegrationManagement,
    MerchantAnalytics,
    NotificationApiError,
    NotificationManagement,
    PaymentProcessor,
    PriceAlertError,
    PriceAlertManagement,
    ProcessorError,
};
