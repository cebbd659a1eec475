use thiserror::Error;

use crate::db_types::{NewPriceAlert, PriceAlert};

#[derive(Debug, Clone, Error)]
pub enum PriceAlertError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Price alert {0} does not exist")]
    AlertNotFound(i64),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Invalid target price: {0}")]
    InvalidTargetPrice(String),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

impl From<sqlx::Error> for PriceAlertError {
    fn from(e: sqlx::Error) -> Self {
        PriceAlertError::DatabaseError(e.to_string())
    }
}

/// Price alerts notify a customer when a product reaches a price, without holding any funds.
///
/// Alerts are triggered by the price change flow ([`crate::traits::BuyOrderDatabase::trigger_price_alerts`]).
#[allow(async_fn_in_trait)]
pub trait PriceAlertManagement {
    async fn insert_price_alert(&self, alert: NewPriceAlert) -> Result<PriceAlert, PriceAlertError>;

    async fn fetch_price_alert(&self, id: i64) -> Result<Option<PriceAlert>, PriceAlertError>;

    async fn alerts_for_customer(&self, customer_id: i64) -> Result<Vec<PriceAlert>, PriceAlertError>;

    /// Withdraws an active alert. Cancelling an alert that is no longer active leaves it untouched. The current state
    /// of the alert is returned in both cases.
    async fn cancel_price_alert(&self, id: i64) -> Result<PriceAlert, PriceAlertError>;

    /// Permanently removes the alert. Returns `false` if it did not exist.
    async fn delete_price_alert(&self, id: i64) -> Result<bool, PriceAlertError>;
}
