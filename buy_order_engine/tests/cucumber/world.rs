use std::collections::HashMap;

use buy_order_engine::{
    db_types::{BuyOrder, Customer, Merchant, NewAccount, Product},
    events::EventProducers,
    test_utils::{
        mock_processor::MockProcessor,
        prepare_env::{create_database, random_db_path, run_migrations},
    },
    AccountManagement,
    BuyOrderFlowApi,
    SqliteDatabase,
};
use cucumber::World;
use log::*;
use tokio::time::sleep;

#[derive(Default, Debug, World)]
pub struct BuyOrderWorld {
    pub system: Option<BuyOrderSystem>,
    pub merchant: Option<Merchant>,
    pub customers: HashMap<String, Customer>,
    pub products: HashMap<String, Product>,
    /// The most recent buy order placed by each customer.
    pub orders: HashMap<String, i64>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct BuyOrderSystem {
    pub db_path: String,
    pub api: BuyOrderFlowApi<SqliteDatabase, MockProcessor>,
    pub processor: MockProcessor,
}

impl BuyOrderWorld {
    pub fn system(&self) -> &BuyOrderSystem {
        self.system.as_ref().expect("Buy order system not initialised")
    }

    pub fn api(&self) -> &BuyOrderFlowApi<SqliteDatabase, MockProcessor> {
        &self.system().api
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api().db()
    }

    pub fn merchant(&self) -> &Merchant {
        self.merchant.as_ref().expect("No merchant has been registered")
    }

    pub fn customer(&self, name: &str) -> &Customer {
        self.customers.get(name).unwrap_or_else(|| panic!("Unknown customer {name}"))
    }

    pub fn product(&self, title: &str) -> &Product {
        self.products.get(title).unwrap_or_else(|| panic!("Unknown product {title}"))
    }

    pub async fn order_of(&self, name: &str) -> BuyOrder {
        let id = *self.orders.get(name).unwrap_or_else(|| panic!("{name} has not placed a buy order"));
        self.api().fetch_buy_order(id).await.expect("Error fetching buy order").expect("Buy order does not exist")
    }
}

impl BuyOrderSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        sleep(std::time::Duration::from_millis(50)).await;
        let processor = MockProcessor::new();
        let api = BuyOrderFlowApi::new(db, processor.clone(), EventProducers::default());
        Self { db_path: url, api, processor }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}

pub fn new_account(name: &str) -> NewAccount {
    NewAccount { email: format!("{name}@example.com"), name: name.to_string(), password_hash: "x".into() }
}

pub async fn register_customer(world: &mut BuyOrderWorld, name: &str) {
    let customer = world.db().register_customer(new_account(name)).await.expect("Error registering customer");
    world.customers.insert(name.to_string(), customer);
}
