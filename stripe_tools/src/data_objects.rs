use std::{collections::BTreeMap, fmt::Display};

use bo_common::Cents;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    /// Funds are authorized and held. This is the only acceptable state for an escrow hold.
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

impl Display for PaymentIntentStatus {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: Cents,
    #[serde(default)]
    pub amount_capturable: Cents,
    #[serde(default)]
    pub amount_received: Cents,
    pub currency: String,
    pub status: PaymentIntentStatus,
    pub application_fee_amount: Option<Cents>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub last_payment_error: Option<Value>,
}

impl PaymentIntent {
    pub fn failure_message(&self) -> Option<String> {
        self.last_payment_error.as_ref().and_then(|e| e["message"].as_str()).map(String::from)
    }
}

/// Parameters for a manually captured payment intent that is confirmed on creation.
#[derive(Debug, Clone)]
pub struct CreateIntentParams {
    pub amount: Cents,
    pub currency: String,
    pub payment_method: String,
    pub application_fee: Cents,
    /// The connected account that receives the funds once captured.
    pub destination: Option<String>,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl CreateIntentParams {
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount.value().to_string()),
            ("currency".to_string(), self.currency.clone()),
            ("payment_method".to_string(), self.payment_method.clone()),
            ("capture_method".to_string(), "manual".to_string()),
            ("confirm".to_string(), "true".to_string()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
            ("automatic_payment_methods[allow_redirects]".to_string(), "never".to_string()),
        ];
        if let Some(destination) = &self.destination {
            form.push(("application_fee_amount".to_string(), self.application_fee.value().to_string()));
            form.push(("transfer_data[destination]".to_string(), destination.clone()));
        }
        if let Some(description) = &self.description {
            form.push(("description".to_string(), description.clone()));
        }
        for (k, v) in &self.metadata {
            form.push((format!("metadata[{k}]"), v.clone()));
        }
        form
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureParams {
    pub amount_to_capture: Cents,
    pub application_fee: Option<Cents>,
}

impl CaptureParams {
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![("amount_to_capture".to_string(), self.amount_to_capture.value().to_string())];
        if let Some(fee) = self.application_fee {
            form.push(("application_fee_amount".to_string(), fee.value().to_string()));
        }
        form
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectAccount {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
}

/// One page of results from a Stripe search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLink {
    pub url: String,
    pub created: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
}

impl StripeEvent {
    /// Interprets the event payload as a payment intent, if that is what it carries.
    pub fn payment_intent(&self) -> Option<PaymentIntent> {
        match self.data.object["object"].as_str() {
            Some("payment_intent") => serde_json::from_value(self.data.object.clone()).ok(),
            _ => None,
        }
    }

    pub fn account(&self) -> Option<ConnectAccount> {
        match self.data.object["object"].as_str() {
            Some("account") => serde_json::from_value(self.data.object.clone()).ok(),
            _ => None,
        }
    }
}
