#![allow(dead_code)]
use bo_common::Cents;
use buy_order_engine::{
    db_types::{Customer, Merchant, NewAccount, NewProduct, Notification, NotificationKind, Product, Recipient},
    events::EventProducers,
    order_objects::{NewBuyOrderRequest, PlacedOrder},
    test_utils::{
        mock_processor::MockProcessor,
        prepare_env::{prepare_test_env, random_db_path},
    },
    AccountManagement,
    BuyOrderDatabase,
    BuyOrderFlowApi,
    CatalogManagement,
    NotificationManagement,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub struct TestSystem {
    pub db_path: String,
    pub api: BuyOrderFlowApi<SqliteDatabase, MockProcessor>,
    pub processor: MockProcessor,
    pub merchant: Merchant,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        let merchant = register_merchant(&db, "merchant", Some("acct_test_merchant")).await;
        let processor = MockProcessor::new();
        let api = BuyOrderFlowApi::new(db, processor.clone(), producers);
        Self { db_path: url, api, processor, merchant }
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api.db()
    }

    pub async fn customer(&self, name: &str) -> Customer {
        let account =
            NewAccount { email: format!("{name}@example.com"), name: name.to_string(), password_hash: "x".into() };
        self.db().register_customer(account).await.expect("Error registering customer")
    }

    pub async fn product(&self, title: &str, price: i64) -> Product {
        let product = NewProduct::new(self.merchant.id, title, Cents::from(price));
        self.db().upsert_product(product).await.expect("Error adding product").product
    }

    pub async fn place_order(&self, customer: &Customer, product: &Product, target: i64) -> PlacedOrder {
        self.api
            .create_buy_order(customer.id, request(product.id, target))
            .await
            .expect("Error placing buy order")
    }

    pub async fn notifications(&self, recipient: Recipient) -> Vec<Notification> {
        self.db().notifications_for(recipient).await.expect("Error fetching notifications")
    }

    pub async fn notification_kinds(&self, recipient: Recipient) -> Vec<NotificationKind> {
        let mut kinds = self.notifications(recipient).await.into_iter().map(|n| n.kind).collect::<Vec<_>>();
        kinds.reverse();
        kinds
    }

    pub async fn tear_down(mut self) {
        if let Err(e) = self.api.db_mut().close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        Sqlite::drop_database(&self.db_path).await.expect("Error dropping database");
    }
}

pub async fn register_merchant(db: &SqliteDatabase, name: &str, stripe_account: Option<&str>) -> Merchant {
    let account = NewAccount { email: format!("{name}@example.com"), name: name.to_string(), password_hash: "x".into() };
    let merchant = db.register_merchant(account).await.expect("Error registering merchant");
    match stripe_account {
        Some(acct) => db.set_stripe_account(merchant.id, acct, true).await.expect("Error linking stripe account"),
        None => merchant,
    }
}

pub fn request(product_id: i64, target: i64) -> NewBuyOrderRequest {
    NewBuyOrderRequest {
        product_id,
        target_price: Cents::from(target),
        payment_method: "pm_card_visa".into(),
        expires_in_days: None,
    }
}
