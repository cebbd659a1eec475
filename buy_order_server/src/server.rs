use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use buy_order_engine::{
    traits::PaymentProcessor,
    AccountApi,
    AnalyticsApi,
    BuyOrderFlowApi,
    CatalogApi,
    IntegrationApi,
    NotificationApi,
    PriceAlertApi,
    SqliteDatabase,
};
use log::*;
use stripe_tools::StripeApi;

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::{
        email::{create_email_event_handlers, EmailClient},
        stripe::StripeProcessor,
    },
    middleware::{HmacMiddlewareFactory, JwtMiddlewareFactory},
    reconcile_worker::start_reconcile_worker,
    routes::{
        health,
        BuyOrderByIdRoute,
        CancelBuyOrderRoute,
        CancelPriceAlertRoute,
        CheckTokenRoute,
        ConnectIntegrationRoute,
        CreateBuyOrderRoute,
        CreatePriceAlertRoute,
        CreateProductRoute,
        DeletePriceAlertRoute,
        DisconnectIntegrationRoute,
        IssueDiscountRoute,
        LoginRoute,
        MarkNotificationReadRoute,
        MerchantAnalyticsRoute,
        MerchantBuyOrdersRoute,
        MyBuyOrdersRoute,
        MyDiscountsRoute,
        MyIntegrationsRoute,
        MyNotificationsRoute,
        MyPriceAlertsRoute,
        MyProductsRoute,
        PriceAlertByIdRoute,
        PriceHistoryRoute,
        SignupRoute,
        StripeConnectRoute,
        SyncIntegrationRoute,
        UpdateProductPriceRoute,
    },
    shopify_routes::{ShopifyProductUpdateRoute, SHOPIFY_HMAC_HEADER},
    stripe_routes::{stripe_connect_refresh, stripe_connect_return, StripeWebhookRoute},
};

const DB_MAX_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, DB_MAX_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let stripe = StripeApi::new(config.stripe.clone())?;
    let email_handlers = create_email_event_handlers(EmailClient::new(config.email.clone()), db.clone());
    let producers = email_handlers.producers();
    email_handlers.start_handlers().await;
    let mut options = config.flow.flow_options();
    options.orphan_grace = config.workers.reconcile_after;
    let api = BuyOrderFlowApi::new(db.clone(), StripeProcessor::new(stripe.clone()), producers).with_options(options);
    let _expiry = start_expiry_worker(api.clone(), config.workers.expiry_check_interval);
    let _reconcile =
        start_reconcile_worker(api.clone(), config.workers.reconcile_interval, config.workers.reconcile_after);
    let srv = create_server_instance(config, db, api, stripe)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Builds the HTTP server around `api`. The server binary passes in the Stripe processor; the end-to-end tests run the
/// same server against a mock processor.
pub fn create_server_instance<P>(
    config: ServerConfig,
    db: SqliteDatabase,
    api: BuyOrderFlowApi<SqliteDatabase, P>,
    stripe: StripeApi,
) -> Result<Server, ServerError>
where
    P: PaymentProcessor + Send + 'static,
{
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let issuer = TokenIssuer::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bos::access_log"))
            .app_data(web::Data::new(api.clone()))
            .app_data(web::Data::new(AccountApi::new(db.clone())))
            .app_data(web::Data::new(CatalogApi::new(db.clone())))
            .app_data(web::Data::new(PriceAlertApi::new(db.clone())))
            .app_data(web::Data::new(NotificationApi::new(db.clone())))
            .app_data(web::Data::new(IntegrationApi::new(db.clone())))
            .app_data(web::Data::new(AnalyticsApi::new(db.clone())))
            .app_data(web::Data::new(issuer.clone()))
            .app_data(web::Data::new(stripe.clone()))
            .app_data(web::Data::new(config.clone()));
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(issuer))
            .service(CheckTokenRoute::new())
            .service(CreateBuyOrderRoute::<SqliteDatabase, P>::new())
            .service(MyBuyOrdersRoute::<SqliteDatabase, P>::new())
            .service(BuyOrderByIdRoute::<SqliteDatabase, P>::new())
            .service(CancelBuyOrderRoute::<SqliteDatabase, P>::new())
            .service(MerchantBuyOrdersRoute::<SqliteDatabase, P>::new())
            .service(CreateProductRoute::<SqliteDatabase>::new())
            .service(MyProductsRoute::<SqliteDatabase>::new())
            .service(UpdateProductPriceRoute::<SqliteDatabase, P>::new())
            .service(PriceHistoryRoute::<SqliteDatabase>::new())
            .service(IssueDiscountRoute::<SqliteDatabase, P>::new())
            .service(MyDiscountsRoute::<SqliteDatabase, P>::new())
            .service(CreatePriceAlertRoute::<SqliteDatabase>::new())
            .service(MyPriceAlertsRoute::<SqliteDatabase>::new())
            .service(PriceAlertByIdRoute::<SqliteDatabase>::new())
            .service(CancelPriceAlertRoute::<SqliteDatabase>::new())
            .service(DeletePriceAlertRoute::<SqliteDatabase>::new())
            .service(MyNotificationsRoute::<SqliteDatabase>::new())
            .service(MarkNotificationReadRoute::<SqliteDatabase>::new())
            .service(MerchantAnalyticsRoute::<SqliteDatabase>::new())
            .service(StripeConnectRoute::<SqliteDatabase>::new())
            .service(ConnectIntegrationRoute::<SqliteDatabase>::new())
            .service(MyIntegrationsRoute::<SqliteDatabase>::new())
            .service(DisconnectIntegrationRoute::<SqliteDatabase>::new())
            .service(SyncIntegrationRoute::<SqliteDatabase, SqliteDatabase, P>::new());
        let hmac_middleware = HmacMiddlewareFactory::new(
            SHOPIFY_HMAC_HEADER,
            config.shopify.hmac_secret.clone(),
            config.shopify.hmac_checks,
        );
        let shopify_scope = web::scope("/shopify")
            .wrap(hmac_middleware)
            .service(ShopifyProductUpdateRoute::<SqliteDatabase, SqliteDatabase, P>::new());
        app.service(health)
            .service(SignupRoute::<SqliteDatabase>::new())
            .service(LoginRoute::<SqliteDatabase>::new())
            .service(StripeWebhookRoute::<SqliteDatabase, P>::new())
            .service(stripe_connect_return)
            .service(stripe_connect_refresh)
            .service(shopify_scope)
            .service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    info!("💻️ Server listening on {host}:{port}");
    Ok(srv)
}
