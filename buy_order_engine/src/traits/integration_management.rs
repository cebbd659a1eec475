use thiserror::Error;

use crate::db_types::{Integration, NewIntegration, Platform};

#[derive(Debug, Clone, Error)]
pub enum IntegrationApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Integration {0} does not exist")]
    IntegrationNotFound(i64),
    #[error("The shop {0} is already connected to another merchant")]
    ShopAlreadyConnected(String),
    #[error("Invalid integration: {0}")]
    InvalidIntegration(String),
}

impl From<sqlx::Error> for IntegrationApiError {
    fn from(e: sqlx::Error) -> Self {
        IntegrationApiError::DatabaseError(e.to_string())
    }
}

/// Tracks merchants' connections to external storefronts.
#[allow(async_fn_in_trait)]
pub trait IntegrationManagement {
    /// Creates the integration, or refreshes the credentials of the merchant's existing integration for the same shop
    /// and marks it connected again. A shop can only be connected to one merchant.
    async fn upsert_integration(
        &self,
        merchant_id: i64,
        integration: NewIntegration,
    ) -> Result<Integration, IntegrationApiError>;

    async fn fetch_integration(&self, id: i64) -> Result<Option<Integration>, IntegrationApiError>;

    async fn integrations_for_merchant(&self, merchant_id: i64) -> Result<Vec<Integration>, IntegrationApiError>;

    /// The connected integration for the shop, if any.
    async fn integration_for_shop(
        &self,
        platform: Platform,
        shop_domain: &str,
    ) -> Result<Option<Integration>, IntegrationApiError>;

    /// Marks the merchant's integration as disconnected. Credentials are kept so that it can be reconnected.
    async fn disconnect_integration(&self, merchant_id: i64, id: i64) -> Result<Integration, IntegrationApiError>;

    async fn mark_integration_synced(&self, id: i64) -> Result<Integration, IntegrationApiError>;
}
