//! Storefront catalog clients.
//!
//! Merchants keep their product catalog in a storefront platform. This crate pulls products and prices from those
//! platforms and normalises them into [`CatalogItem`]s, priced in [`bo_common::Cents`].
mod catalog_item;
mod config;
mod data_objects;
mod error;
mod shopify_api;
mod shopify_product;
mod woocommerce_api;

pub mod helpers;

pub use catalog_item::CatalogItem;
pub use config::{ShopifyConfig, WooCommerceConfig, DEFAULT_SHOPIFY_API_VERSION};
pub use data_objects::{NewWebhook, Webhook};
pub use error::StorefrontApiError;
pub use shopify_api::ShopifyApi;
pub use shopify_product::{ShopifyProduct, Variant};
pub use woocommerce_api::{WooCommerceApi, WooProduct};
