//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use buy_order_engine::{
    db_types::{NewAccount, NewDiscount, NewIntegration, NewProduct, Platform, PriceAlert, PriceChangeSource, Recipient, Role},
    order_objects::{Actor, NewBuyOrderRequest},
    traits::{
        AccountManagement,
        BuyOrderDatabase,
        CatalogManagement,
        IntegrationManagement,
        MerchantAnalytics,
        NotificationManagement,
        PaymentProcessor,
        PriceAlertManagement,
    },
    AccountApi,
    AnalyticsApi,
    BuyOrderFlowApi,
    CatalogApi,
    IntegrationApi,
    NotificationApi,
    PriceAlertApi,
    PriceAlertError,
};
use log::*;
use stripe_tools::StripeApi;

use crate::{
    auth::{hash_password, verify_password, JwtClaims, TokenIssuer},
    config::ServerConfig,
    data_objects::{
        AuthResponse,
        BuyOrderDetail,
        ConnectOnboarding,
        LoginRequest,
        NewPriceAlertParams,
        NewProductParams,
        OrderStatusFilter,
        SignupRequest,
        UpdatePriceParams,
    },
    errors::{AuthError, ServerError},
    integrations::storefront::{install_product_webhook, sync_storefront},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
//
// * `requires [roles]`: a plain handler behind the ACL.
// * `impl A + B where requires [roles]`: one backend type that implements every bound, behind the ACL.
// * `impl A, B`: one type parameter per bound. The handler's type parameters must be declared in the same order.
// * `impl A, B where requires [roles]`: as above, behind the ACL.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $first:ident $(+ $rest:ident)+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $first $(+ $rest)+ + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// The customer id behind the token. Customer-only operations act on this id, even for admins.
fn customer_id(claims: &JwtClaims) -> Result<i64, ServerError> {
    match claims.role {
        Role::Customer => Ok(claims.account_id),
        _ => Err(ServerError::InsufficientPermissions("Only customer accounts can do this".into())),
    }
}

fn merchant_id(claims: &JwtClaims) -> Result<i64, ServerError> {
    match claims.role {
        Role::Merchant => Ok(claims.account_id),
        _ => Err(ServerError::InsufficientPermissions("Only merchant accounts can do this".into())),
    }
}

fn recipient(claims: &JwtClaims) -> Result<Recipient, ServerError> {
    match claims.role {
        Role::Customer => Ok(Recipient::customer(claims.account_id)),
        Role::Merchant => Ok(Recipient::merchant(claims.account_id)),
        Role::Admin => Err(ServerError::InvalidRequestBody("Admin tokens have no inbox".into())),
    }
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(signup => Post "/auth/signup" impl AccountManagement);
/// Registers a customer or merchant account and logs it in.
///
/// Passwords must be at least 8 characters long. Emails are unique per account type, so the same address can hold
/// one customer and one merchant account.
pub async fn signup<B: AccountManagement>(
    body: web::Json<SignupRequest>,
    api: web::Data<AccountApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let SignupRequest { role, email, name, password } = body.into_inner();
    debug!("💻️ Signup request for a {role} account");
    let password_hash = hash_password(&password)?;
    let account = NewAccount { email, name, password_hash };
    let (account_id, email) = match role {
        Role::Customer => {
            let customer = api.register_customer(account).await?;
            (customer.id, customer.email)
        },
        Role::Merchant => {
            let merchant = api.register_merchant(account).await?;
            (merchant.id, merchant.email)
        },
        Role::Admin => return Err(ServerError::InvalidRequestBody("Admin accounts cannot be registered".into())),
    };
    let token = signer.issue_token(account_id, role, &email)?;
    info!("💻️ New {role} account #{account_id} registered");
    Ok(HttpResponse::Created().json(AuthResponse { account_id, role, token }))
}

route!(login => Post "/auth/login" impl AccountManagement);
/// Exchanges an email and password for an access token.
///
/// Unknown accounts and wrong passwords get the same 401 response.
pub async fn login<B: AccountManagement>(
    body: web::Json<LoginRequest>,
    api: web::Data<AccountApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let LoginRequest { role, email, password } = body.into_inner();
    trace!("💻️ Login request for a {role} account");
    let found = match role {
        Role::Customer => api.fetch_customer_by_email(&email).await?.map(|(c, hash)| (c.id, c.email, hash)),
        Role::Merchant => api.fetch_merchant_by_email(&email).await?.map(|(m, hash)| (m.id, m.email, hash)),
        Role::Admin => None,
    };
    let (account_id, email, hash) = found.ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(&password, &hash) {
        debug!("💻️ Wrong password for {role} account #{account_id}");
        return Err(AuthError::InvalidCredentials.into());
    }
    let token = signer.issue_token(account_id, role, &email)?;
    debug!("💻️ {role} account #{account_id} logged in");
    Ok(HttpResponse::Ok().json(AuthResponse { account_id, role, token }))
}

route!(check_token => Get "/check_token" requires [Role::Customer, Role::Merchant]);
pub async fn check_token(claims: JwtClaims) -> impl Responder {
    trace!("💻️ Token check for account #{}", claims.account_id);
    HttpResponse::Ok().json(claims)
}

//----------------------------------------------   Buy orders  ----------------------------------------------------
route!(create_buy_order => Post "/buy_orders" impl BuyOrderDatabase, PaymentProcessor where requires [Role::Customer]);
/// Places a buy order. The target amount is held on the customer's card until the order completes.
///
/// Responds with the new order and its escrow payment. A declined or unconfirmed hold is a 402 and leaves no order
/// behind.
pub async fn create_buy_order<B: BuyOrderDatabase, P: PaymentProcessor>(
    claims: JwtClaims,
    body: web::Json<NewBuyOrderRequest>,
    api: web::Data<BuyOrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = customer_id(&claims)?;
    let request = body.into_inner();
    debug!("💻️ Customer #{customer_id} is placing a buy order for product #{}", request.product_id);
    let placed = api.create_buy_order(customer_id, request).await?;
    Ok(HttpResponse::Created().json(placed))
}

route!(my_buy_orders => Get "/buy_orders" impl BuyOrderDatabase, PaymentProcessor where requires [Role::Customer]);
pub async fn my_buy_orders<B: BuyOrderDatabase, P: PaymentProcessor>(
    claims: JwtClaims,
    api: web::Data<BuyOrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = customer_id(&claims)?;
    trace!("💻️ GET buy orders for customer #{customer_id}");
    let orders = api.orders_for_customer(customer_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(buy_order_by_id => Get "/buy_orders/{id}" impl BuyOrderDatabase, PaymentProcessor where requires [Role::Customer, Role::Merchant]);
/// Fetches a buy order with its escrow payment and ledger.
///
/// Customers can see their own orders and merchants the orders for their products. Admins can see every order.
pub async fn buy_order_by_id<B: BuyOrderDatabase, P: PaymentProcessor>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<BuyOrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET buy order #{id}");
    let order = api.fetch_buy_order(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Buy order {id}")))?;
    let visible = claims.is_admin() ||
        match claims.role {
            Role::Customer => order.customer_id == claims.account_id,
            Role::Merchant => order.merchant_id == claims.account_id,
            Role::Admin => true,
        };
    if !visible {
        return Err(ServerError::InsufficientPermissions(format!("Buy order {id} belongs to another account")));
    }
    let escrow = api.escrow_for_order(id).await?;
    let ledger = api.ledger_for_order(id).await?;
    Ok(HttpResponse::Ok().json(BuyOrderDetail { order, escrow, ledger }))
}

route!(cancel_buy_order => Post "/buy_orders/{id}/cancel" impl BuyOrderDatabase, PaymentProcessor where requires [Role::Customer, Role::Merchant]);
/// Cancels a monitoring buy order and releases its hold in full.
pub async fn cancel_buy_order<B: BuyOrderDatabase, P: PaymentProcessor>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<BuyOrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let actor = match (claims.is_admin(), claims.role) {
        (true, _) => Actor::Admin,
        (false, Role::Merchant) => Actor::Merchant(claims.account_id),
        _ => Actor::Customer(claims.account_id),
    };
    debug!("💻️ {actor:?} is cancelling buy order #{id}");
    let order = api.cancel_buy_order(id, actor).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(merchant_buy_orders => Get "/merchant/buy_orders" impl BuyOrderDatabase, PaymentProcessor where requires [Role::Merchant]);
/// Lists the buy orders placed against the merchant's products, optionally filtered with `?status=monitoring`.
pub async fn merchant_buy_orders<B: BuyOrderDatabase, P: PaymentProcessor>(
    claims: JwtClaims,
    query: web::Query<OrderStatusFilter>,
    api: web::Data<BuyOrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let OrderStatusFilter { status } = query.into_inner();
    trace!("💻️ GET buy orders for merchant #{merchant_id} ({status:?})");
    let orders = api.orders_for_merchant(merchant_id, status).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Products  ----------------------------------------------------
route!(create_product => Post "/products" impl CatalogManagement where requires [Role::Merchant]);
pub async fn create_product<B: CatalogManagement>(
    claims: JwtClaims,
    body: web::Json<NewProductParams>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let NewProductParams { title, price } = body.into_inner();
    debug!("💻️ Merchant #{merchant_id} is adding '{title}' at {price}");
    let result = api.upsert_product(NewProduct::new(merchant_id, title, price)).await?;
    Ok(HttpResponse::Created().json(result.product))
}

route!(my_products => Get "/products" impl CatalogManagement where requires [Role::Merchant]);
pub async fn my_products<B: CatalogManagement>(
    claims: JwtClaims,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let products = api.products_for_merchant(merchant_id).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(update_product_price => Post "/products/{id}/price" impl BuyOrderDatabase, PaymentProcessor where requires [Role::Merchant]);
/// Sets a new price for one of the merchant's products. Buy orders whose target the new price meets are fulfilled
/// straight away, and the report of what happened is returned.
pub async fn update_product_price<B: BuyOrderDatabase, P: PaymentProcessor>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<UpdatePriceParams>,
    api: web::Data<BuyOrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let product_id = path.into_inner();
    let price = body.into_inner().price;
    CatalogApi::new(api.db().clone()).fetch_product_for_merchant(merchant_id, product_id).await?;
    info!("💻️📉️ Merchant #{merchant_id} set the price of product #{product_id} to {price}");
    let report = api.process_price_change(product_id, price, PriceChangeSource::Manual).await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(price_history => Get "/products/{id}/history" impl CatalogManagement where requires [Role::Merchant]);
pub async fn price_history<B: CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    if !claims.is_admin() {
        api.fetch_product_for_merchant(merchant_id(&claims)?, product_id).await?;
    }
    let history = api.price_history(product_id).await?;
    Ok(HttpResponse::Ok().json(history))
}

//----------------------------------------------   Discounts  ----------------------------------------------------
route!(issue_discount => Post "/discounts" impl BuyOrderDatabase, PaymentProcessor where requires [Role::Merchant]);
/// Offers a product at a discount. Waiting buy orders that the discount applies to are fulfilled at the discount
/// price until the discount runs out of uses.
pub async fn issue_discount<B: BuyOrderDatabase, P: PaymentProcessor>(
    claims: JwtClaims,
    body: web::Json<NewDiscount>,
    api: web::Data<BuyOrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let discount = body.into_inner();
    debug!("💻️🏷️ Merchant #{merchant_id} is offering product #{} at {}", discount.product_id, discount.discount_price);
    let report = api.issue_discount(merchant_id, discount).await?;
    Ok(HttpResponse::Created().json(report))
}

route!(my_discounts => Get "/discounts" impl BuyOrderDatabase, PaymentProcessor where requires [Role::Merchant]);
pub async fn my_discounts<B: BuyOrderDatabase, P: PaymentProcessor>(
    claims: JwtClaims,
    api: web::Data<BuyOrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let discounts = api.discounts_for_merchant(merchant_id).await?;
    Ok(HttpResponse::Ok().json(discounts))
}

//----------------------------------------------   Price alerts  ----------------------------------------------------
route!(create_price_alert => Post "/price_alerts" impl PriceAlertManagement + CatalogManagement where requires [Role::Customer]);
pub async fn create_price_alert<B: PriceAlertManagement + CatalogManagement>(
    claims: JwtClaims,
    body: web::Json<NewPriceAlertParams>,
    api: web::Data<PriceAlertApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = customer_id(&claims)?;
    let NewPriceAlertParams { product_id, target_price, email } = body.into_inner();
    let email = email.unwrap_or_else(|| claims.email.clone());
    let alert = api.create_alert(customer_id, &email, product_id, target_price).await?;
    debug!("💻️🔔️ Customer #{customer_id} is watching product #{product_id} for {target_price}");
    Ok(HttpResponse::Created().json(alert))
}

route!(my_price_alerts => Get "/price_alerts" impl PriceAlertManagement + CatalogManagement where requires [Role::Customer]);
pub async fn my_price_alerts<B: PriceAlertManagement + CatalogManagement>(
    claims: JwtClaims,
    api: web::Data<PriceAlertApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = customer_id(&claims)?;
    let alerts = api.alerts_for_customer(customer_id).await?;
    Ok(HttpResponse::Ok().json(alerts))
}

route!(price_alert_by_id => Get "/price_alerts/{id}" impl PriceAlertManagement + CatalogManagement where requires [Role::Customer]);
pub async fn price_alert_by_id<B: PriceAlertManagement + CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<PriceAlertApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let alert = owned_alert(&claims, path.into_inner(), api.as_ref()).await?;
    Ok(HttpResponse::Ok().json(alert))
}

route!(cancel_price_alert => Post "/price_alerts/{id}/cancel" impl PriceAlertManagement + CatalogManagement where requires [Role::Customer]);
pub async fn cancel_price_alert<B: PriceAlertManagement + CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<PriceAlertApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let alert = owned_alert(&claims, path.into_inner(), api.as_ref()).await?;
    let alert = api.cancel_alert(alert.id).await?;
    Ok(HttpResponse::Ok().json(alert))
}

route!(delete_price_alert => Delete "/price_alerts/{id}" impl PriceAlertManagement + CatalogManagement where requires [Role::Customer]);
pub async fn delete_price_alert<B: PriceAlertManagement + CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<PriceAlertApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let alert = owned_alert(&claims, path.into_inner(), api.as_ref()).await?;
    api.delete_alert(alert.id).await?;
    debug!("💻️🔔️ Price alert #{} deleted", alert.id);
    Ok(HttpResponse::NoContent().finish())
}

async fn owned_alert<B: PriceAlertManagement + CatalogManagement>(
    claims: &JwtClaims,
    id: i64,
    api: &PriceAlertApi<B>,
) -> Result<PriceAlert, ServerError> {
    let alert = api.fetch_alert(id).await?.ok_or(PriceAlertError::AlertNotFound(id))?;
    if claims.is_admin() || (claims.role == Role::Customer && alert.customer_id == claims.account_id) {
        Ok(alert)
    } else {
        Err(ServerError::InsufficientPermissions(format!("Price alert {id} belongs to another account")))
    }
}

//----------------------------------------------   Notifications  ----------------------------------------------------
route!(my_notifications => Get "/notifications" impl NotificationManagement);
pub async fn my_notifications<B: NotificationManagement>(
    claims: JwtClaims,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let notifications = api.notifications_for(recipient(&claims)?).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

route!(mark_notification_read => Post "/notifications/{id}/read" impl NotificationManagement);
pub async fn mark_notification_read<B: NotificationManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let notification = api.mark_read(recipient(&claims)?, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(notification))
}

//----------------------------------------------   Merchant tools  ----------------------------------------------------
route!(merchant_analytics => Get "/analytics" impl MerchantAnalytics + AccountManagement where requires [Role::Merchant]);
pub async fn merchant_analytics<B: MerchantAnalytics + AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AnalyticsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let summary = api.merchant_summary(merchant_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(stripe_connect => Post "/stripe/connect" impl AccountManagement where requires [Role::Merchant]);
/// Starts (or resumes) the merchant's Stripe Connect onboarding.
///
/// A connected account is created the first time this is called. Every call returns a fresh onboarding link.
pub async fn stripe_connect<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
    stripe: web::Data<StripeApi>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let merchant =
        api.fetch_merchant(merchant_id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Merchant {merchant_id}")))?;
    let stripe_account_id = match merchant.stripe_account_id {
        Some(id) if !id.is_empty() => id,
        _ => {
            let account = stripe.create_connect_account(&merchant.email).await?;
            api.set_stripe_account(merchant_id, &account.id, account.charges_enabled).await?;
            info!("💻️💳️ Merchant #{merchant_id} now has Stripe account {}", account.id);
            account.id
        },
    };
    let refresh_url = format!("{}/stripe/connect/refresh", config.public_url);
    let return_url = format!("{}/stripe/connect/return", config.public_url);
    let link = stripe.create_account_link(&stripe_account_id, &refresh_url, &return_url).await?;
    Ok(HttpResponse::Ok().json(ConnectOnboarding {
        stripe_account_id,
        onboarding_url: link.url,
        expires_at: link.expires_at,
    }))
}

//----------------------------------------------   Integrations  ----------------------------------------------------
route!(connect_integration => Post "/integrations" impl IntegrationManagement where requires [Role::Merchant]);
/// Connects a storefront. For Shopify shops, the product update webhook is installed in the background.
pub async fn connect_integration<B: IntegrationManagement>(
    claims: JwtClaims,
    body: web::Json<NewIntegration>,
    api: web::Data<IntegrationApi<B>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let integration = api.connect(merchant_id, body.into_inner()).await?;
    if integration.platform == Platform::Shopify {
        let integration = integration.clone();
        let address = format!("{}/shopify/webhook/product_update", config.public_url);
        actix_web::rt::spawn(async move {
            if let Err(e) = install_product_webhook(&integration, &address).await {
                warn!("💻️🔌️ Could not install the product webhook on {}. {e}", integration.shop_domain);
            }
        });
    }
    Ok(HttpResponse::Created().json(integration))
}

route!(my_integrations => Get "/integrations" impl IntegrationManagement where requires [Role::Merchant]);
pub async fn my_integrations<B: IntegrationManagement>(
    claims: JwtClaims,
    api: web::Data<IntegrationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let integrations = api.integrations_for_merchant(merchant_id).await?;
    Ok(HttpResponse::Ok().json(integrations))
}

route!(disconnect_integration => Delete "/integrations/{id}" impl IntegrationManagement where requires [Role::Merchant]);
pub async fn disconnect_integration<B: IntegrationManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<IntegrationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let integration = api.disconnect(merchant_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(integration))
}

route!(sync_integration => Post "/integrations/{id}/sync" impl IntegrationManagement, BuyOrderDatabase, PaymentProcessor where requires [Role::Merchant]);
/// Pulls the storefront's catalog and applies it. Price changes go through the price change flow, so buy orders can
/// be fulfilled as a result of a sync.
pub async fn sync_integration<I: IntegrationManagement, B: BuyOrderDatabase, P: PaymentProcessor>(
    claims: JwtClaims,
    path: web::Path<i64>,
    integrations: web::Data<IntegrationApi<I>>,
    api: web::Data<BuyOrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = merchant_id(&claims)?;
    let id = path.into_inner();
    let integration = integrations
        .fetch_integration(id)
        .await?
        .filter(|i| i.merchant_id == merchant_id)
        .ok_or_else(|| ServerError::NoRecordFound(format!("Integration {id}")))?;
    let report = sync_storefront(&integration, api.as_ref()).await?;
    integrations.mark_synced(id).await?;
    Ok(HttpResponse::Ok().json(report))
}
