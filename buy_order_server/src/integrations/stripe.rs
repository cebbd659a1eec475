//! The Stripe-backed [`PaymentProcessor`].
//!
//! Holds are manual-capture payment intents routed to the merchant's Connect account. The platform fee is charged as
//! an application fee, which Stripe deducts from the captured amount before paying out to the merchant.
use bo_common::Cents;
use buy_order_engine::traits::{
    HoldRequest,
    IntentInfo,
    IntentStatus,
    PaymentProcessor,
    ProcessorError,
    LEDGER_ENTRY_METADATA_KEY,
};
use log::*;
use stripe_tools::{CaptureParams, CreateIntentParams, PaymentIntent, PaymentIntentStatus, StripeApi, StripeApiError};

#[derive(Clone)]
pub struct StripeProcessor {
    api: StripeApi,
}

impl StripeProcessor {
    pub fn new(api: StripeApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &StripeApi {
        &self.api
    }
}

pub fn intent_status(status: PaymentIntentStatus) -> IntentStatus {
    match status {
        PaymentIntentStatus::RequiresPaymentMethod => IntentStatus::RequiresPaymentMethod,
        PaymentIntentStatus::RequiresConfirmation => IntentStatus::RequiresConfirmation,
        PaymentIntentStatus::RequiresAction => IntentStatus::RequiresAction,
        PaymentIntentStatus::Processing => IntentStatus::Processing,
        PaymentIntentStatus::RequiresCapture => IntentStatus::RequiresCapture,
        PaymentIntentStatus::Canceled => IntentStatus::Canceled,
        PaymentIntentStatus::Succeeded => IntentStatus::Succeeded,
        PaymentIntentStatus::Unknown => IntentStatus::Unknown,
    }
}

pub fn intent_info(intent: &PaymentIntent) -> IntentInfo {
    IntentInfo {
        id: intent.id.clone(),
        status: intent_status(intent.status),
        amount: intent.amount,
        amount_received: intent.amount_received,
        failure_message: intent.failure_message(),
        ledger_entry_id: intent.metadata.get(LEDGER_ENTRY_METADATA_KEY).and_then(|id| id.parse().ok()),
    }
}

fn processor_error(e: StripeApiError) -> ProcessorError {
    if e.is_card_error() {
        return ProcessorError::Declined(e.to_string());
    }
    match e {
        StripeApiError::ApiError { .. } | StripeApiError::Initialization(_) | StripeApiError::InvalidSignature(_) => {
            ProcessorError::Rejected(e.to_string())
        },
        StripeApiError::RequestError(_) | StripeApiError::JsonError(_) => ProcessorError::Unavailable(e.to_string()),
    }
}

impl PaymentProcessor for StripeProcessor {
    async fn create_hold(&self, request: HoldRequest) -> Result<IntentInfo, ProcessorError> {
        let mut metadata = request.metadata;
        metadata.insert(LEDGER_ENTRY_METADATA_KEY.to_string(), request.ledger_entry_id.to_string());
        let params = CreateIntentParams {
            amount: request.amount,
            currency: request.currency,
            payment_method: request.payment_method,
            application_fee: request.platform_fee,
            destination: Some(request.destination_account),
            description: request.description,
            metadata,
        };
        let intent = self.api.create_payment_intent(&params, &request.idempotency_key).await.map_err(|e| {
            warn!("💳️ Could not place a hold of {}. {e}", request.amount);
            processor_error(e)
        })?;
        Ok(intent_info(&intent))
    }

    async fn capture(
        &self,
        intent_id: &str,
        amount: Cents,
        platform_fee: Cents,
        idempotency_key: &str,
    ) -> Result<IntentInfo, ProcessorError> {
        let params = CaptureParams { amount_to_capture: amount, application_fee: Some(platform_fee) };
        let intent = self.api.capture_payment_intent(intent_id, params, idempotency_key).await.map_err(|e| {
            warn!("💳️ Could not capture {amount} on {intent_id}. {e}");
            processor_error(e)
        })?;
        Ok(intent_info(&intent))
    }

    async fn cancel(&self, intent_id: &str, idempotency_key: &str) -> Result<IntentInfo, ProcessorError> {
        let intent = self.api.cancel_payment_intent(intent_id, idempotency_key).await.map_err(|e| {
            warn!("💳️ Could not release the hold on {intent_id}. {e}");
            processor_error(e)
        })?;
        Ok(intent_info(&intent))
    }

    async fn retrieve(&self, intent_id: &str) -> Result<IntentInfo, ProcessorError> {
        let intent = self.api.retrieve_payment_intent(intent_id).await.map_err(processor_error)?;
        Ok(intent_info(&intent))
    }

    async fn find_hold(&self, ledger_entry_id: i64) -> Result<Option<IntentInfo>, ProcessorError> {
        let intents = self
            .api
            .search_payment_intents_by_metadata(LEDGER_ENTRY_METADATA_KEY, &ledger_entry_id.to_string())
            .await
            .map_err(processor_error)?;
        if intents.len() > 1 {
            warn!("💳️ {} payment intents carry ledger entry #{ledger_entry_id}. Using the first.", intents.len());
        }
        Ok(intents.first().map(intent_info))
    }
}
