use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::ShopifyConfig,
    data_objects::{NewWebhook, Webhook},
    CatalogItem,
    ShopifyProduct,
    StorefrontApiError,
};

const PRODUCT_PAGE_SIZE: usize = 250;

#[derive(Clone)]
pub struct ShopifyApi {
    config: ShopifyConfig,
    client: Arc<Client>,
}

impl ShopifyApi {
    pub fn new(config: ShopifyConfig) -> Result<Self, StorefrontApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.admin_access_token.reveal().as_str())
            .map_err(|e| StorefrontApiError::Initialization(e.to_string()))?;
        headers.insert("X-Shopify-Access-Token", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StorefrontApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, StorefrontApiError> {
        let url = self.url(path);
        trace!("🛍️ Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| StorefrontApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🛍️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StorefrontApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StorefrontApiError::RestResponseError(e.to_string()))?;
            Err(StorefrontApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://{}/admin/api/{}{path}", self.config.shop, self.config.api_version)
    }

    pub fn shop(&self) -> &str {
        self.config.shop.as_str()
    }

    /// Fetches a page of products with ids greater than `since_id`, in ascending id order.
    pub async fn fetch_products_page(&self, since_id: i64, limit: usize) -> Result<Vec<ShopifyProduct>, StorefrontApiError> {
        #[derive(Deserialize)]
        struct ProductsResponse {
            products: Vec<ShopifyProduct>,
        }
        let since = since_id.to_string();
        let limit = limit.to_string();
        let params = [("since_id", since.as_str()), ("limit", limit.as_str())];
        let result = self.rest_query::<ProductsResponse, ()>(Method::GET, "/products.json", &params, None).await?;
        debug!("🛍️ Fetched {} products from {} after id {since_id}", result.products.len(), self.config.shop);
        Ok(result.products)
    }

    pub async fn fetch_all_products(&self) -> Result<Vec<ShopifyProduct>, StorefrontApiError> {
        let mut products = Vec::new();
        let mut since_id = 0;
        loop {
            let page = self.fetch_products_page(since_id, PRODUCT_PAGE_SIZE).await?;
            let count = page.len();
            if let Some(last) = page.last() {
                since_id = last.id;
            }
            products.extend(page);
            if count < PRODUCT_PAGE_SIZE {
                break;
            }
        }
        info!("🛍️ Fetched {} products from {}", products.len(), self.config.shop);
        Ok(products)
    }

    /// Fetches the shop's active products as catalog items. Products without a parseable price are skipped and logged.
    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>, StorefrontApiError> {
        let products = self.fetch_all_products().await?;
        let items = products
            .iter()
            .filter(|p| p.is_active())
            .filter_map(|p| match CatalogItem::try_from(p) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("🛍️ Skipping Shopify product {} ({}). {e}", p.id, p.title);
                    None
                },
            })
            .collect();
        Ok(items)
    }

    pub async fn fetch_product(&self, product_id: i64) -> Result<ShopifyProduct, StorefrontApiError> {
        #[derive(Deserialize)]
        struct ProductResponse {
            product: ShopifyProduct,
        }
        let path = format!("/products/{product_id}.json");
        let result = self.rest_query::<ProductResponse, ()>(Method::GET, &path, &[], None).await?;
        Ok(result.product)
    }

    pub async fn fetch_webhooks(&self) -> Result<Vec<Webhook>, StorefrontApiError> {
        #[derive(Deserialize)]
        struct WebhookResponse {
            webhooks: Vec<Webhook>,
        }
        debug!("🛍️ Fetching webhooks");
        let result = self.rest_query::<WebhookResponse, ()>(Method::GET, "/webhooks.json", &[], None).await?;
        Ok(result.webhooks)
    }

    pub async fn install_webhook(&self, address: &str, topic: &str) -> Result<Webhook, StorefrontApiError> {
        #[derive(Serialize)]
        struct WebhookInput {
            webhook: NewWebhook,
        }
        #[derive(Deserialize)]
        struct WebhookResponse {
            webhook: Webhook,
        }
        let webhook = NewWebhook { topic: topic.to_string(), address: address.to_string(), format: "json".to_string() };
        let input = WebhookInput { webhook };
        debug!("🛍️ Installing {topic} webhook on {} -> {address}", self.config.shop);
        let result =
            self.rest_query::<WebhookResponse, WebhookInput>(Method::POST, "/webhooks.json", &[], Some(input)).await?;
        info!("🛍️ Installed webhook: {:?}", result.webhook.id);
        Ok(result.webhook)
    }

    /// Installs the webhook unless one for the same topic and address already exists.
    pub async fn ensure_webhook(&self, address: &str, topic: &str) -> Result<Webhook, StorefrontApiError> {
        let existing = self.fetch_webhooks().await?;
        match existing.into_iter().find(|w| w.topic == topic && w.address == address) {
            Some(w) => {
                debug!("🛍️ Webhook {topic} already installed on {} with id {}", self.config.shop, w.id);
                Ok(w)
            },
            None => self.install_webhook(address, topic).await,
        }
    }
}
