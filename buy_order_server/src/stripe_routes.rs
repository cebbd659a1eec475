//----------------------------------------------   Stripe webhooks  ----------------------------------------------------
//
// Payment intent events are the processor's callback half of the escrow ledger: any pending ledger entry for the
// intent is resolved against the status Stripe reports. Stripe retries on anything but a 2xx, so once the signature
// has been verified the handler always answers 200.
use actix_web::{get, web, HttpRequest, HttpResponse};
use buy_order_engine::{
    traits::{BuyOrderDatabase, PaymentProcessor},
    AccountApi,
    BuyOrderFlowApi,
};
use chrono::Utc;
use log::*;
use stripe_tools::{
    webhook::{verify_signature, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER},
    StripeEvent,
};

use crate::{
    config::ServerConfig,
    data_objects::JsonResponse,
    errors::{AuthError, ServerError},
    helpers::header_str,
    integrations::stripe::intent_info,
    route,
};

route!(stripe_webhook => Post "/stripe/webhook" impl BuyOrderDatabase, PaymentProcessor);
pub async fn stripe_webhook<B, P>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<BuyOrderFlowApi<B, P>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: BuyOrderDatabase,
    P: PaymentProcessor,
{
    let signature = header_str(&req, SIGNATURE_HEADER)
        .ok_or_else(|| AuthError::InvalidSignature(format!("Missing {SIGNATURE_HEADER} header")))?;
    let secret = config.stripe.webhook_secret.reveal();
    verify_signature(&body, signature, secret, DEFAULT_TOLERANCE_SECS, Utc::now())?;
    let event = match serde_json::from_slice::<StripeEvent>(&body) {
        Ok(ev) => ev,
        Err(e) => {
            warn!("💳️ Could not parse Stripe event. {e}");
            return Ok(HttpResponse::Ok().json(JsonResponse::failure("Unrecognised event payload")));
        },
    };
    debug!("💳️ Stripe event {} ({})", event.id, event.event_type);
    let result = handle_event(&event, api.as_ref()).await;
    Ok(HttpResponse::Ok().json(result))
}

async fn handle_event<B, P>(event: &StripeEvent, api: &BuyOrderFlowApi<B, P>) -> JsonResponse
where
    B: BuyOrderDatabase,
    P: PaymentProcessor,
{
    if event.event_type.starts_with("payment_intent.") {
        let Some(intent) = event.payment_intent() else {
            return JsonResponse::failure("Event does not carry a payment intent");
        };
        let info = intent_info(&intent);
        return match api.reconcile_intent(&info).await {
            Ok(report) if report.is_empty() => {
                trace!("💳️ Nothing to reconcile for {} ({})", info.id, info.status);
                JsonResponse::success("No pending ledger entries")
            },
            Ok(report) => {
                info!(
                    "💳️ {} ledger entries for {} resolved as {}. {} orders updated",
                    report.resolved.len(),
                    info.id,
                    info.status,
                    report.orders.len()
                );
                JsonResponse::success(format!("{} ledger entries resolved", report.resolved.len()))
            },
            Err(e) => {
                warn!("💳️ Could not reconcile {}. {e}", info.id);
                JsonResponse::failure(e)
            },
        };
    }
    if event.event_type == "account.updated" {
        let Some(account) = event.account() else {
            return JsonResponse::failure("Event does not carry an account");
        };
        let accounts = AccountApi::new(api.db().clone());
        return match accounts.update_charges_enabled(&account.id, account.charges_enabled).await {
            Ok(Some(merchant)) => {
                info!(
                    "💳️ Stripe account {} for merchant #{} updated. charges: {}, payouts: {}, details: {}",
                    account.id, merchant.id, account.charges_enabled, account.payouts_enabled, account.details_submitted
                );
                JsonResponse::success("Account update recorded")
            },
            Ok(None) => {
                debug!("💳️ Ignoring update for unknown Stripe account {}", account.id);
                JsonResponse::success("Unknown account")
            },
            Err(e) => JsonResponse::failure(e),
        };
    }
    trace!("💳️ Ignoring Stripe event type {}", event.event_type);
    JsonResponse::success("Event ignored")
}

#[get("/stripe/connect/return")]
pub async fn stripe_connect_return() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Stripe onboarding is complete. You can close this window and return to your dashboard.")
}

#[get("/stripe/connect/refresh")]
pub async fn stripe_connect_refresh() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("This onboarding link has expired. Start Stripe onboarding again from your dashboard for a new link.")
}
