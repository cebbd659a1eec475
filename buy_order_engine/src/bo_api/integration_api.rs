use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Integration, NewIntegration, Platform},
    traits::{IntegrationApiError, IntegrationManagement},
};

/// Manages merchants' connections to their storefronts.
pub struct IntegrationApi<B> {
    db: B,
}

impl<B> Debug for IntegrationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IntegrationApi")
    }
}

impl<B: Clone> Clone for IntegrationApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> IntegrationApi<B>
where B: IntegrationManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn connect(&self, merchant_id: i64, mut integration: NewIntegration) -> Result<Integration, IntegrationApiError> {
        integration.shop_domain = normalize_shop_domain(&integration.shop_domain);
        if integration.shop_domain.is_empty() {
            return Err(IntegrationApiError::InvalidIntegration("A shop domain is required".into()));
        }
        if integration.access_token.trim().is_empty() {
            return Err(IntegrationApiError::InvalidIntegration("An access token is required".into()));
        }
        let result = self.db.upsert_integration(merchant_id, integration).await?;
        info!("🔌️ Merchant #{merchant_id} connected {} shop {}", result.platform, result.shop_domain);
        Ok(result)
    }

    pub async fn disconnect(&self, merchant_id: i64, id: i64) -> Result<Integration, IntegrationApiError> {
        let result = self.db.disconnect_integration(merchant_id, id).await?;
        info!("🔌️ Merchant #{merchant_id} disconnected {} shop {}", result.platform, result.shop_domain);
        Ok(result)
    }

    pub async fn fetch_integration(&self, id: i64) -> Result<Option<Integration>, IntegrationApiError> {
        self.db.fetch_integration(id).await
    }

    pub async fn integrations_for_merchant(&self, merchant_id: i64) -> Result<Vec<Integration>, IntegrationApiError> {
        self.db.integrations_for_merchant(merchant_id).await
    }

    pub async fn integration_for_shop(
        &self,
        platform: Platform,
        shop_domain: &str,
    ) -> Result<Option<Integration>, IntegrationApiError> {
        self.db.integration_for_shop(platform, &normalize_shop_domain(shop_domain)).await
    }

    pub async fn mark_synced(&self, id: i64) -> Result<Integration, IntegrationApiError> {
        self.db.mark_integration_synced(id).await
    }
}

/// Reduces a shop URL to its bare, lowercased host, so that `https://Shop.example.com/` and `shop.example.com` match.
pub fn normalize_shop_domain(domain: &str) -> String {
    let domain = domain.trim().to_lowercase();
    let domain = domain.strip_prefix("https://").or_else(|| domain.strip_prefix("http://")).unwrap_or(&domain);
    domain.trim_end_matches('/').to_string()
}
