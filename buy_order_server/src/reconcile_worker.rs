use buy_order_engine::{
    order_objects::ReconcileReport,
    traits::{BuyOrderDatabase, PaymentProcessor},
    BuyOrderFlowApi,
    SqliteDatabase,
};
use chrono::Duration;
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::stripe::StripeProcessor;

/// Starts the ledger reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Ledger entries are normally resolved by the Stripe webhook. This worker catches the ones whose webhook never
/// arrived, or whose processor call died before a response came back.
pub fn start_reconcile_worker(
    api: BuyOrderFlowApi<SqliteDatabase, StripeProcessor>,
    interval: std::time::Duration,
    older_than: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🧾️ Escrow ledger reconciliation worker started");
        loop {
            timer.tick().await;
            run_reconcile_job(&api, older_than).await;
        }
    })
}

pub async fn run_reconcile_job<B, P>(api: &BuyOrderFlowApi<B, P>, older_than: Duration) -> Option<ReconcileReport>
where
    B: BuyOrderDatabase,
    P: PaymentProcessor,
{
    trace!("🧾️ Running escrow ledger reconciliation job");
    match api.reconcile_stale_ledger(older_than).await {
        Ok(report) => {
            if !report.is_empty() {
                info!(
                    "🧾️ {} stale ledger entries resolved. {} buy orders updated",
                    report.resolved.len(),
                    report.orders.len()
                );
            }
            Some(report)
        },
        Err(e) => {
            error!("🧾️ Error running escrow ledger reconciliation job: {e}");
            None
        },
    }
}
