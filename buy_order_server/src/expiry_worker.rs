use buy_order_engine::{
    db_types::BuyOrder,
    order_objects::ExpiryReport,
    traits::{BuyOrderDatabase, PaymentProcessor},
    BuyOrderFlowApi,
    SqliteDatabase,
};
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::stripe::StripeProcessor;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_worker(
    api: BuyOrderFlowApi<SqliteDatabase, StripeProcessor>,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("⏰️ Buy order expiry worker started");
        loop {
            timer.tick().await;
            run_expiry_job(&api).await;
        }
    })
}

/// Releases the holds of lapsed buy orders and retires lapsed discounts.
pub async fn run_expiry_job<B, P>(api: &BuyOrderFlowApi<B, P>) -> Option<ExpiryReport>
where
    B: BuyOrderDatabase,
    P: PaymentProcessor,
{
    trace!("⏰️ Running buy order expiry job");
    match api.expire_due_orders().await {
        Ok(report) => {
            if !report.expired.is_empty() || report.discounts_expired > 0 {
                info!("⏰️ {} buy orders and {} discounts expired", report.expired.len(), report.discounts_expired);
                debug!("⏰️ Expired buy orders: {}", order_list(&report.expired));
            }
            for failure in &report.failures {
                warn!("⏰️ Buy order #{} could not be expired. {}", failure.buy_order_id, failure.error);
            }
            Some(report)
        },
        Err(e) => {
            error!("⏰️ Error running buy order expiry job: {e}");
            None
        },
    }
}

fn order_list(orders: &[BuyOrder]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] product: {} customer: {}", o.id, o.product_id, o.customer_id))
        .collect::<Vec<String>>()
        .join(", ")
}
