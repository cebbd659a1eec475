use std::fmt::Debug;

use bo_common::Cents;
use log::*;

use crate::{
    db_types::{NewPriceAlert, PriceAlert},
    traits::{CatalogManagement, PriceAlertError, PriceAlertManagement},
};

/// Hold-free price alerts. A customer is emailed when the product reaches the alert price; no money is involved.
pub struct PriceAlertApi<B> {
    db: B,
}

impl<B> Debug for PriceAlertApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PriceAlertApi")
    }
}

impl<B: Clone> Clone for PriceAlertApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> PriceAlertApi<B>
where B: PriceAlertManagement + CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn create_alert(
        &self,
        customer_id: i64,
        email: &str,
        product_id: i64,
        target_price: Cents,
    ) -> Result<PriceAlert, PriceAlertError> {
        if !target_price.is_positive() {
            return Err(PriceAlertError::InvalidTargetPrice("The alert price must be greater than zero".into()));
        }
        let email = email.trim().to_lowercase();
        if !email.split_once('@').is_some_and(|(user, domain)| !user.is_empty() && !domain.is_empty()) {
            return Err(PriceAlertError::InvalidEmail(email));
        }
        self.db
            .fetch_product(product_id)
            .await
            .map_err(|e| PriceAlertError::DatabaseError(e.to_string()))?
            .ok_or(PriceAlertError::ProductNotFound(product_id))?;
        let alert = self.db.insert_price_alert(NewPriceAlert { customer_id, product_id, email, target_price }).await?;
        debug!("🔔️ Price alert #{} created for product #{product_id} at {target_price}", alert.id);
        Ok(alert)
    }

    pub async fn fetch_alert(&self, id: i64) -> Result<Option<PriceAlert>, PriceAlertError> {
        self.db.fetch_price_alert(id).await
    }

    pub async fn alerts_for_customer(&self, customer_id: i64) -> Result<Vec<PriceAlert>, PriceAlertError> {
        self.db.alerts_for_customer(customer_id).await
    }

    /// Withdraws the alert (status `expired`). Cancelling twice returns the same row.
    pub async fn cancel_alert(&self, id: i64) -> Result<PriceAlert, PriceAlertError> {
        let alert = self.db.cancel_price_alert(id).await?;
        debug!("🔔️ Price alert #{id} is now {}", alert.status);
        Ok(alert)
    }

    pub async fn delete_alert(&self, id: i64) -> Result<(), PriceAlertError> {
        if self.db.delete_price_alert(id).await? {
            debug!("🔔️ Price alert #{id} deleted");
            Ok(())
        } else {
            Err(PriceAlertError::AlertNotFound(id))
        }
    }
}
