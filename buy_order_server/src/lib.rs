//! # Buy order server
//! This crate hosts the HTTP API for conditional buy orders. It is responsible for:
//! * Registering customers and merchants, and issuing their access tokens.
//! * Accepting buy orders, and placing the escrow hold for each one with Stripe.
//! * Watching for price drops (manual, storefront webhook or catalog sync) and discounts that fulfill buy orders.
//! * Receiving Stripe webhooks that settle the escrow ledger.
//! * Releasing the holds of expired orders, and emailing customers and merchants about what happened.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! Public routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/auth/signup` and `/auth/login`: Account registration and login. Both return a bearer token.
//! * `/stripe/webhook`: Payment intent and Connect account events from Stripe.
//! * `/shopify/webhook/product_update`: Product updates from connected Shopify shops.
//!
//! Everything else lives under `/api` and needs an `Authorization: Bearer <token>` header.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod reconcile_worker;
pub mod routes;
pub mod server;
pub mod shopify_routes;
pub mod stripe_routes;

#[cfg(test)]
mod endpoint_tests;
#[cfg(test)]
mod test_helpers;
