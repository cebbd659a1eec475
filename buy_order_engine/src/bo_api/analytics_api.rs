use std::fmt::Debug;

use crate::traits::{AccountManagement, AnalyticsError, MerchantAnalytics, MerchantSummary};

/// Read-only reporting for the merchant dashboard.
pub struct AnalyticsApi<B> {
    db: B,
}

impl<B> Debug for AnalyticsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AnalyticsApi")
    }
}

impl<B: Clone> Clone for AnalyticsApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> AnalyticsApi<B>
where B: MerchantAnalytics + AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn merchant_summary(&self, merchant_id: i64) -> Result<MerchantSummary, AnalyticsError> {
        self.db
            .fetch_merchant(merchant_id)
            .await
            .map_err(|e| AnalyticsError::DatabaseError(e.to_string()))?
            .ok_or(AnalyticsError::MerchantNotFound(merchant_id))?;
        let order_counts = self.db.order_status_counts(merchant_id).await?;
        let total_orders = order_counts.iter().map(|c| c.count).sum();
        let escrow = self.db.escrow_totals(merchant_id).await?;
        let product_count = self.db.product_count(merchant_id).await?;
        let products = self.db.product_demand(merchant_id).await?;
        Ok(MerchantSummary { merchant_id, order_counts, total_orders, escrow, product_count, products })
    }
}
