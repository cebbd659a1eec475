use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    config::StripeConfig,
    data_objects::{AccountLink, CaptureParams, ConnectAccount, CreateIntentParams, PaymentIntent, SearchResult},
    StripeApiError,
};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val = HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert("Stripe-Version", HeaderValue::from_static("2024-06-20"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base.trim_end_matches('/'))
    }

    /// Sends a form-encoded request, which is what the Stripe API expects for every mutating call.
    ///
    /// When an idempotency key is supplied, Stripe guarantees that retries of the same call with the same key return
    /// the original result rather than creating a second hold or capturing twice.
    pub async fn form_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending Stripe request: {method} {url}");
        let mut req = self.client.request(method.clone(), url);
        if !form.is_empty() {
            req = if method == Method::GET { req.query(form) } else { req.form(form) };
        }
        if let Some(key) = idempotency_key {
            req = req.header(IDEMPOTENCY_HEADER, key);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            trace!("💳️ Stripe request successful. {status}");
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let text = response.text().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
            let err = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(ErrorEnvelope { error }) => StripeApiError::ApiError {
                    status: status.as_u16(),
                    kind: error.kind.unwrap_or_else(|| "api_error".to_string()),
                    code: error.code,
                    message: error.message.unwrap_or_default(),
                },
                Err(_) => StripeApiError::ApiError {
                    status: status.as_u16(),
                    kind: "api_error".to_string(),
                    code: None,
                    message: text,
                },
            };
            debug!("💳️ Stripe request failed. {err}");
            Err(err)
        }
    }

    pub async fn create_payment_intent(
        &self,
        params: &CreateIntentParams,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, StripeApiError> {
        debug!("💳️ Creating manual-capture payment intent for {}", params.amount);
        let form = params.to_form();
        let intent: PaymentIntent =
            self.form_request(Method::POST, "/payment_intents", &form, Some(idempotency_key)).await?;
        info!("💳️ Payment intent {} created with status {}", intent.id, intent.status);
        Ok(intent)
    }

    pub async fn capture_payment_intent(
        &self,
        intent_id: &str,
        params: CaptureParams,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, StripeApiError> {
        debug!("💳️ Capturing {} on payment intent {intent_id}", params.amount_to_capture);
        let path = format!("/payment_intents/{intent_id}/capture");
        let intent: PaymentIntent =
            self.form_request(Method::POST, &path, &params.to_form(), Some(idempotency_key)).await?;
        info!("💳️ Payment intent {intent_id} captured. Status: {}", intent.status);
        Ok(intent)
    }

    pub async fn cancel_payment_intent(
        &self,
        intent_id: &str,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, StripeApiError> {
        debug!("💳️ Cancelling payment intent {intent_id}");
        let path = format!("/payment_intents/{intent_id}/cancel");
        let form = vec![("cancellation_reason".to_string(), "requested_by_customer".to_string())];
        let intent: PaymentIntent = self.form_request(Method::POST, &path, &form, Some(idempotency_key)).await?;
        info!("💳️ Payment intent {intent_id} cancelled. Status: {}", intent.status);
        Ok(intent)
    }

    pub async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, StripeApiError> {
        let path = format!("/payment_intents/{intent_id}");
        self.form_request(Method::GET, &path, &[], None).await
    }

    /// Finds payment intents whose metadata `key` equals `value`. Stripe's search index lags writes by up to a
    /// minute, so a miss shortly after creating an intent is not conclusive.
    pub async fn search_payment_intents_by_metadata(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Vec<PaymentIntent>, StripeApiError> {
        let form = vec![("query".to_string(), metadata_query(key, value))];
        let page: SearchResult<PaymentIntent> =
            self.form_request(Method::GET, "/payment_intents/search", &form, None).await?;
        trace!("💳️ Search for {key}={value} returned {} payment intents", page.data.len());
        Ok(page.data)
    }

    /// Creates an Express connected account for a merchant.
    pub async fn create_connect_account(&self, email: &str) -> Result<ConnectAccount, StripeApiError> {
        debug!("💳️ Creating Connect account for {email}");
        let form = vec![
            ("type".to_string(), "express".to_string()),
            ("email".to_string(), email.to_string()),
            ("capabilities[card_payments][requested]".to_string(), "true".to_string()),
            ("capabilities[transfers][requested]".to_string(), "true".to_string()),
        ];
        let account: ConnectAccount = self.form_request(Method::POST, "/accounts", &form, None).await?;
        info!("💳️ Connect account {} created", account.id);
        Ok(account)
    }

    pub async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink, StripeApiError> {
        let form = vec![
            ("account".to_string(), account_id.to_string()),
            ("refresh_url".to_string(), refresh_url.to_string()),
            ("return_url".to_string(), return_url.to_string()),
            ("type".to_string(), "account_onboarding".to_string()),
        ];
        self.form_request(Method::POST, "/account_links", &form, None).await
    }
}

fn metadata_query(key: &str, value: &str) -> String {
    format!("metadata['{key}']:'{}'", value.replace('\'', "\\'"))
}
