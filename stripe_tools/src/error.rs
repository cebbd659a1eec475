use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request could not be sent: {0}")]
    RequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Stripe rejected the request ({status}). {kind}: {message}")]
    ApiError { status: u16, kind: String, code: Option<String>, message: String },
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
}

impl StripeApiError {
    /// Card declines and other payment failures come back as 402 `card_error`s. These are the customer's problem, not
    /// ours, and are worth telling apart from transport or configuration problems.
    pub fn is_card_error(&self) -> bool {
        matches!(self, Self::ApiError { kind, .. } if kind == "card_error")
    }
}
