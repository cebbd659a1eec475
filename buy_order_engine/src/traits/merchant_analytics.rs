use bo_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use crate::traits::{ProductDemand, StatusCount};

#[derive(Debug, Clone, Error)]
pub enum AnalyticsError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Merchant {0} does not exist")]
    MerchantNotFound(i64),
}

impl From<sqlx::Error> for AnalyticsError {
    fn from(e: sqlx::Error) -> Self {
        AnalyticsError::DatabaseError(e.to_string())
    }
}

/// Totals over the escrow payments of a merchant's buy orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct EscrowTotals {
    /// Funds currently held for monitoring orders.
    pub held: Cents,
    /// Amounts captured from fulfilled orders.
    pub captured: Cents,
    pub platform_fees: Cents,
    pub merchant_earnings: Cents,
}

/// Read-only reporting queries for the merchant dashboard.
#[allow(async_fn_in_trait)]
pub trait MerchantAnalytics {
    async fn order_status_counts(&self, merchant_id: i64) -> Result<Vec<StatusCount>, AnalyticsError>;

    async fn escrow_totals(&self, merchant_id: i64) -> Result<EscrowTotals, AnalyticsError>;

    async fn product_count(&self, merchant_id: i64) -> Result<i64, AnalyticsError>;

    /// Demand for each of the merchant's products, busiest first.
    async fn product_demand(&self, merchant_id: i64) -> Result<Vec<ProductDemand>, AnalyticsError>;
}
