use std::{collections::BTreeMap, fmt::Display};

use bo_common::Cents;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The metadata key under which holds carry the id of the ledger entry they were placed for.
pub const LEDGER_ENTRY_METADATA_KEY: &str = "ledger_entry_id";

/// The lifecycle states of a payment intent at the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    /// The funds are authorized and held, waiting to be captured or released.
    RequiresCapture,
    Canceled,
    Succeeded,
    Unknown,
}

impl Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::Processing => "processing",
            Self::RequiresCapture => "requires_capture",
            Self::Canceled => "canceled",
            Self::Succeeded => "succeeded",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A request to authorize, but not capture, `amount` on the customer's payment method.
#[derive(Debug, Clone)]
pub struct HoldRequest {
    pub amount: Cents,
    pub platform_fee: Cents,
    pub currency: String,
    pub payment_method: String,
    /// The processor account of the merchant that will receive the funds once they are captured.
    pub destination_account: String,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// The authorize ledger entry this hold belongs to. Implementations store it with the intent under
    /// [`LEDGER_ENTRY_METADATA_KEY`], so that [`PaymentProcessor::find_hold`] can find the hold again.
    pub ledger_entry_id: i64,
    /// Retrying a hold with the same key must never place a second hold.
    pub idempotency_key: String,
}

/// The processor's view of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentInfo {
    pub id: String,
    pub status: IntentStatus,
    pub amount: Cents,
    pub amount_received: Cents,
    pub failure_message: Option<String>,
    /// The authorize ledger entry the intent was created for, if the processor reported it.
    pub ledger_entry_id: Option<i64>,
}

#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("The payment was declined: {0}")]
    Declined(String),
    #[error("The payment processor rejected the request: {0}")]
    Rejected(String),
    #[error("The payment processor is unavailable: {0}")]
    Unavailable(String),
}

/// Places, captures and releases escrow holds with a card processor.
///
/// Every mutating call carries an idempotency key taken from the escrow ledger, so implementations must forward it
/// to the processor.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor: Clone {
    /// Creates and confirms a manual-capture payment intent.
    async fn create_hold(&self, request: HoldRequest) -> Result<IntentInfo, ProcessorError>;

    /// Captures `amount` (which may be less than the held amount) and collects `platform_fee` on it. The remainder of
    /// the hold is released back to the customer.
    async fn capture(
        &self,
        intent_id: &str,
        amount: Cents,
        platform_fee: Cents,
        idempotency_key: &str,
    ) -> Result<IntentInfo, ProcessorError>;

    /// Releases the hold in full.
    async fn cancel(&self, intent_id: &str, idempotency_key: &str) -> Result<IntentInfo, ProcessorError>;

    async fn retrieve(&self, intent_id: &str) -> Result<IntentInfo, ProcessorError>;

    /// Looks for a hold placed for the given authorize ledger entry. This is how a hold whose response never arrived
    /// is found again.
    async fn find_hold(&self, ledger_entry_id: i64) -> Result<Option<IntentInfo>, ProcessorError>;
}
