use bo_common::Secret;
use log::*;

pub const DEFAULT_SHOPIFY_API_VERSION: &str = "2024-04";

/// Connection details for one merchant's Shopify shop. These come from the merchant's integration record rather than
/// from the environment, since every merchant has their own shop.
#[derive(Debug, Clone, Default)]
pub struct ShopifyConfig {
    /// e.g. "my-shop.myshopify.com"
    pub shop: String,
    pub admin_access_token: Secret<String>,
    pub api_version: String,
}

impl ShopifyConfig {
    pub fn new(shop: &str, admin_access_token: Secret<String>) -> Self {
        Self { shop: shop.to_string(), admin_access_token, api_version: api_version_from_env_or_default() }
    }
}

pub fn api_version_from_env_or_default() -> String {
    std::env::var("BOS_SHOPIFY_API_VERSION").unwrap_or_else(|_| {
        debug!("🪛️ BOS_SHOPIFY_API_VERSION not set, using {DEFAULT_SHOPIFY_API_VERSION} as default");
        DEFAULT_SHOPIFY_API_VERSION.to_string()
    })
}

#[derive(Debug, Clone, Default)]
pub struct WooCommerceConfig {
    /// The WordPress site root, e.g. "https://shop.example.com"
    pub site_url: String,
    pub consumer_key: String,
    pub consumer_secret: Secret<String>,
}

impl WooCommerceConfig {
    pub fn new(site_url: &str, consumer_key: &str, consumer_secret: Secret<String>) -> Self {
        let site_url = site_url.trim_end_matches('/').to_string();
        let site_url = if site_url.starts_with("http://") || site_url.starts_with("https://") {
            site_url
        } else {
            format!("https://{site_url}")
        };
        Self { site_url, consumer_key: consumer_key.to_string(), consumer_secret }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn woo_site_urls_are_normalised() {
        let c = WooCommerceConfig::new("shop.example.com/", "ck_1", Secret::new("cs_1".into()));
        assert_eq!(c.site_url, "https://shop.example.com");
        let c = WooCommerceConfig::new("http://localhost:8080", "ck_1", Secret::default());
        assert_eq!(c.site_url, "http://localhost:8080");
    }
}
