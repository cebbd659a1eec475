use std::env;

use bo_common::{parse_boolean_flag, parse_env_number, Secret};
use buy_order_engine::order_objects::FlowOptions;
use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use stripe_tools::StripeConfig;

use crate::errors::ServerError;

const DEFAULT_BOS_HOST: &str = "127.0.0.1";
const DEFAULT_BOS_PORT: u16 = 8470;
const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;
const DEFAULT_PLATFORM_FEE_BPS: u32 = 250;
const DEFAULT_ORDER_EXPIRY_DAYS: i64 = 30;
const DEFAULT_MAX_ORDER_EXPIRY_DAYS: i64 = 90;
const DEFAULT_EXPIRY_CHECK_INTERVAL_SECS: u64 = 60;
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;
const DEFAULT_RECONCILE_AFTER_SECS: i64 = 600;
const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_EMAIL_FROM: &str = "Buy Orders <orders@localhost>";
/// Fee rates above 100% make no sense
const MAX_FEE_BPS: u32 = 10_000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The externally reachable base URL of this server, used to build webhook and onboarding return addresses.
    pub public_url: String,
    pub auth: AuthConfig,
    pub flow: FlowConfig,
    pub workers: WorkerConfig,
    pub stripe: StripeConfig,
    pub shopify: ShopifyWebhookConfig,
    pub email: EmailConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BOS_HOST.into(),
            port: DEFAULT_BOS_PORT,
            database_url: String::default(),
            public_url: format!("http://{DEFAULT_BOS_HOST}:{DEFAULT_BOS_PORT}"),
            auth: AuthConfig::default(),
            flow: FlowConfig::default(),
            workers: WorkerConfig::default(),
            stripe: StripeConfig::default(),
            shopify: ShopifyWebhookConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BOS_HOST").ok().unwrap_or_else(|| DEFAULT_BOS_HOST.into());
        let port = env::var("BOS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BOS_PORT. {e} Using the default, {DEFAULT_BOS_PORT}, instead."
                    );
                    DEFAULT_BOS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BOS_PORT);
        let database_url = env::var("BOS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BOS_DATABASE_URL is not set. Please set it to the URL for the buy order database.");
            String::default()
        });
        let public_url = env::var("BOS_PUBLIC_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                let url = format!("http://{host}:{port}");
                warn!("🪛️ BOS_PUBLIC_URL is not set. Webhooks and onboarding links will point to {url}");
                url
            });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        Self {
            host,
            port,
            database_url,
            public_url,
            auth,
            flow: FlowConfig::from_env_or_default(),
            workers: WorkerConfig::from_env_or_default(),
            stripe: StripeConfig::new_from_env_or_default(),
            shopify: ShopifyWebhookConfig::from_env_or_default(),
            email: EmailConfig::from_env_or_default(),
        }
    }
}

/// Reads a numeric setting, logging and falling back to `default` when it is missing or malformed.
fn env_number<T>(name: &str, default: T) -> T
where T: std::str::FromStr + std::fmt::Display + Copy {
    let raw = env::var(name).ok();
    match (raw.as_deref(), parse_env_number::<T>(raw.clone())) {
        (None, _) => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        (Some(_), Some(v)) => v,
        (Some(s), None) => {
            warn!("🪛️ Invalid configuration value for {name}: '{s}'. Using the default value of {default}.");
            default
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HMAC key used to sign and verify access tokens.
    pub jwt_secret: Secret<String>,
    pub jwt_expiry: Duration,
    /// Accounts registered with one of these (lowercase) email addresses are granted the admin role when they log in.
    pub admin_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since every access token becomes invalid when the server restarts. Set \
             BOS_JWT_SECRET instead. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self {
            jwt_secret: Secret::new(secret),
            jwt_expiry: Duration::hours(DEFAULT_JWT_EXPIRY_HOURS),
            admin_emails: admin_emails_from_env(),
        }
    }
}

impl AuthConfig {
    pub fn new(secret: &str) -> Self {
        Self {
            jwt_secret: Secret::new(secret.to_string()),
            jwt_expiry: Duration::hours(DEFAULT_JWT_EXPIRY_HOURS),
            admin_emails: vec![],
        }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("BOS_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [BOS_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError("BOS_JWT_SECRET must be at least 32 characters long".into()));
        }
        let hours = env_number("BOS_JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS).max(1);
        Ok(Self {
            jwt_secret: Secret::new(secret),
            jwt_expiry: Duration::hours(hours),
            admin_emails: admin_emails_from_env(),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|a| *a == email)
    }
}

fn admin_emails_from_env() -> Vec<String> {
    env::var("BOS_ADMIN_EMAILS")
        .map(|s| s.split(',').map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()).collect())
        .unwrap_or_default()
}

//-------------------------------------------------  FlowConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct FlowConfig {
    pub platform_fee_bps: u32,
    pub default_order_expiry_days: i64,
    pub max_order_expiry_days: i64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            default_order_expiry_days: DEFAULT_ORDER_EXPIRY_DAYS,
            max_order_expiry_days: DEFAULT_MAX_ORDER_EXPIRY_DAYS,
        }
    }
}

impl FlowConfig {
    pub fn from_env_or_default() -> Self {
        let mut platform_fee_bps = env_number("BOS_PLATFORM_FEE_BPS", DEFAULT_PLATFORM_FEE_BPS);
        if platform_fee_bps > MAX_FEE_BPS {
            warn!("🪛️ BOS_PLATFORM_FEE_BPS of {platform_fee_bps} is above 100%. Using {DEFAULT_PLATFORM_FEE_BPS}.");
            platform_fee_bps = DEFAULT_PLATFORM_FEE_BPS;
        }
        let max_order_expiry_days = env_number("BOS_MAX_ORDER_EXPIRY_DAYS", DEFAULT_MAX_ORDER_EXPIRY_DAYS).max(1);
        let mut default_order_expiry_days = env_number("BOS_DEFAULT_ORDER_EXPIRY_DAYS", DEFAULT_ORDER_EXPIRY_DAYS);
        if default_order_expiry_days < 1 || default_order_expiry_days > max_order_expiry_days {
            let fallback = max_order_expiry_days.min(DEFAULT_ORDER_EXPIRY_DAYS);
            warn!(
                "🪛️ BOS_DEFAULT_ORDER_EXPIRY_DAYS must be between 1 and {max_order_expiry_days}. Using {fallback}."
            );
            default_order_expiry_days = fallback;
        }
        Self { platform_fee_bps, default_order_expiry_days, max_order_expiry_days }
    }

    pub fn flow_options(&self) -> FlowOptions {
        FlowOptions {
            fee_rate_bps: self.platform_fee_bps,
            default_expiry_days: self.default_order_expiry_days,
            max_expiry_days: self.max_order_expiry_days,
            ..FlowOptions::default()
        }
    }
}

//------------------------------------------------  WorkerConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub expiry_check_interval: std::time::Duration,
    pub reconcile_interval: std::time::Duration,
    /// Pending ledger entries younger than this are left alone, since their request may still be in flight.
    pub reconcile_after: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            expiry_check_interval: std::time::Duration::from_secs(DEFAULT_EXPIRY_CHECK_INTERVAL_SECS),
            reconcile_interval: std::time::Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECS),
            reconcile_after: Duration::seconds(DEFAULT_RECONCILE_AFTER_SECS),
        }
    }
}

impl WorkerConfig {
    pub fn from_env_or_default() -> Self {
        let expiry = env_number("BOS_EXPIRY_CHECK_INTERVAL_SECS", DEFAULT_EXPIRY_CHECK_INTERVAL_SECS).max(1);
        let reconcile = env_number("BOS_RECONCILE_INTERVAL_SECS", DEFAULT_RECONCILE_INTERVAL_SECS).max(1);
        let after = env_number("BOS_RECONCILE_AFTER_SECS", DEFAULT_RECONCILE_AFTER_SECS).max(0);
        Self {
            expiry_check_interval: std::time::Duration::from_secs(expiry),
            reconcile_interval: std::time::Duration::from_secs(reconcile),
            reconcile_after: Duration::seconds(after),
        }
    }
}

//--------------------------------------------  ShopifyWebhookConfig  --------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct ShopifyWebhookConfig {
    /// The app's client secret. Shopify signs every webhook body with it.
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
}

impl ShopifyWebhookConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = env::var("BOS_SHOPIFY_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ BOS_SHOPIFY_HMAC_SECRET is not set. Shopify webhooks will be rejected.");
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("BOS_SHOPIFY_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Shopify HMAC checks are DISABLED. Anyone can post product updates to this server.");
        }
        Self { hmac_secret: Secret::new(hmac_secret), hmac_checks }
    }
}

//-------------------------------------------------  EmailConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: Secret<String>,
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: DEFAULT_EMAIL_API_URL.into(),
            api_key: Secret::default(),
            from: DEFAULT_EMAIL_FROM.into(),
        }
    }
}

impl EmailConfig {
    pub fn from_env_or_default() -> Self {
        let api_key = env::var("BOS_EMAIL_API_KEY").unwrap_or_default();
        let enabled = parse_boolean_flag(env::var("BOS_EMAIL_ENABLED").ok(), !api_key.is_empty());
        if enabled && api_key.is_empty() {
            warn!("🪛️ Email is enabled, but BOS_EMAIL_API_KEY is not set. Every send will fail.");
        }
        if !enabled {
            info!("🪛️ Email delivery is disabled. Emails will only be logged.");
        }
        Self {
            enabled,
            api_url: env::var("BOS_EMAIL_API_URL").unwrap_or_else(|_| DEFAULT_EMAIL_API_URL.into()),
            api_key: Secret::new(api_key),
            from: env::var("BOS_EMAIL_FROM").unwrap_or_else(|_| DEFAULT_EMAIL_FROM.into()),
        }
    }
}
