//! # Buy order engine public API
//!
//! The `bo_api` module exposes the programmatic API for the buy order engine.
//! The API is modular, so that clients of the API can pick and choose the functionality they want.
//!
//! * [`buy_order_flow_api`] is the primary API. It places buy orders, reacts to price changes and discounts, releases
//!   holds for cancelled and expired orders, and reconciles the escrow ledger with the payment processor.
//! * [`accounts_api`] registers and looks up customers and merchants.
//! * [`catalog_api`] maintains the product catalog.
//! * [`price_alert_api`] manages hold-free price alerts.
//! * [`notification_api`] gives access to in-app notifications and the email log.
//! * [`analytics_api`] builds the merchant dashboard summary.
//! * [`integration_api`] tracks merchant storefront connections.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific backend traits required by the API.
//!
//! ```rust,ignore
//! use buy_order_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements AccountManagement
//! let api = AccountApi::new(db);
//! let merchant = api.fetch_merchant(1).await?;
//! ```
pub mod accounts_api;
pub mod analytics_api;
pub mod buy_order_flow_api;
pub mod catalog_api;
pub mod integration_api;
pub mod notification_api;
pub mod order_objects;
pub mod price_alert_api;
