use std::{collections::HashMap, sync::mpsc::channel};

use actix_web::dev::ServerHandle;
use buy_order_engine::{
    events::EventProducers,
    test_utils::{
        mock_processor::MockProcessor,
        prepare_env::{create_database, random_db_path, run_migrations},
    },
    BuyOrderDatabase,
    BuyOrderFlowApi,
    SqliteDatabase,
};
use buy_order_server::{
    config::{AuthConfig, ServerConfig},
    server::create_server_instance,
};
use cucumber::World;
use log::*;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use stripe_tools::{StripeApi, StripeConfig};

pub const WEBHOOK_SECRET: &str = "whsec_e2e_secret";
pub const ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Debug, Clone, World)]
pub struct BuyOrderWorld {
    pub config: ServerConfig,
    pub db: Option<SqliteDatabase>,
    pub processor: MockProcessor,
    pub server_handle: Option<ServerHandle>,
    /// Account ids, by the name used in the feature file
    pub accounts: HashMap<String, i64>,
    /// Access tokens received from the server, by the name used in the feature file
    pub tokens: HashMap<String, String>,
    pub response: Option<(StatusCode, String)>,
}

impl Default for BuyOrderWorld {
    fn default() -> Self {
        let _ = env_logger::try_init().ok();
        let mut auth = AuthConfig::new("an-e2e-secret-that-is-long-enough");
        auth.admin_emails = vec![ADMIN_EMAIL.to_string()];
        let mut config = ServerConfig::new("127.0.0.1", 20000 + rand::random::<u16>() % 10_000);
        config.database_url = random_db_path();
        config.auth = auth;
        config.stripe = StripeConfig::new("sk_test_e2e", WEBHOOK_SECRET);
        Self {
            config,
            db: None,
            processor: MockProcessor::new(),
            server_handle: None,
            accounts: HashMap::new(),
            tokens: HashMap::new(),
            response: None,
        }
    }
}

impl BuyOrderWorld {
    pub async fn start_database(&mut self) {
        let url = self.config.database_url.clone();
        create_database(&url).await;
        run_migrations(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("🌍️ Created database: {url}");
        self.db = Some(db);
    }

    pub fn database(&self) -> &SqliteDatabase {
        self.db.as_ref().expect("Database not started")
    }

    pub async fn start_server(&mut self) {
        let config = self.config.clone();
        let db = self.database().clone();
        let api = BuyOrderFlowApi::new(db.clone(), self.processor.clone(), EventProducers::default());
        let stripe = StripeApi::new(config.stripe.clone()).expect("Error creating Stripe client");
        info!("🌍️ Starting server on {}:{} using DB {}", config.host, config.port, db.url());
        let (tx, rx) = channel();
        tokio::spawn(async move {
            let srv = create_server_instance(config, db, api, stripe).expect("Error creating server instance");
            let _res = tx.send(srv.handle());
            match srv.await {
                Ok(_) => info!("🌍️ Server shut down"),
                Err(e) => warn!("🌍️ Server error: {e}"),
            }
        });
        let handle = rx.recv().expect("Server did not start");
        info!("🌍️ Server started");
        self.server_handle = Some(handle);
    }

    pub fn account_id(&self, name: &str) -> i64 {
        *self.accounts.get(name).unwrap_or_else(|| panic!("{name} does not have an account"))
    }

    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        self.request(None, Method::GET, path, |req| req).await
    }

    /// Sends a request to the server, with `user`'s access token if they have logged in.
    pub async fn request<F>(&self, user: Option<&str>, method: Method, path: &str, req: F) -> (StatusCode, String)
    where F: FnOnce(RequestBuilder) -> RequestBuilder {
        let url = format!("http://{}:{}{path}", self.config.host, self.config.port);
        debug!("🌍️ Querying {url}");
        let client = Client::new();
        let request = client.request(method, url);
        let mut request = req(request);
        if let Some(token) = user.and_then(|u| self.tokens.get(u)) {
            debug!("🌍️ Adding auth token to request");
            request = request.bearer_auth(token);
        }
        let res = request.send().await.expect("Error getting response");
        let code = res.status();
        let body = res.text().await.expect("Error parsing response body");
        (code, body)
    }
}
