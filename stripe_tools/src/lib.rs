//! A deliberately small client for the parts of the Stripe API that escrow-style payments need:
//!
//! * Payment intents created with `capture_method=manual`, so that funds are held rather than charged, and later
//!   captured (possibly for a smaller amount) or cancelled.
//! * Connect express accounts and onboarding links, so that captured funds can be routed to merchants with an
//!   application fee retained by the platform.
//! * Verification of the `Stripe-Signature` header on incoming webhook calls.
mod api;
mod config;
mod data_objects;
mod error;

pub mod webhook;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{
    AccountLink,
    CaptureParams,
    ConnectAccount,
    CreateIntentParams,
    PaymentIntent,
    PaymentIntentStatus,
    SearchResult,
    StripeEvent,
};
pub use error::StripeApiError;
