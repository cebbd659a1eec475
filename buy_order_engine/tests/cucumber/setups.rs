use bo_common::Cents;
use buy_order_engine::{db_types::NewProduct, AccountManagement, CatalogManagement};
use cucumber::given;

use crate::cucumber::world::{new_account, register_customer, BuyOrderSystem, BuyOrderWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut BuyOrderWorld) {
    let system = BuyOrderSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a merchant '{word}' with processor account '{word}'")]
async fn merchant_with_account(world: &mut BuyOrderWorld, name: String, account: String) {
    let db = world.db();
    let merchant = db.register_merchant(new_account(&name)).await.expect("Error registering merchant");
    let merchant = db.set_stripe_account(merchant.id, &account, true).await.expect("Error linking processor account");
    world.merchant = Some(merchant);
}

#[given(expr = "customers {string}")]
async fn customers(world: &mut BuyOrderWorld, names: String) {
    for name in names.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        register_customer(world, name).await;
    }
}

#[given(expr = "a product '{word}' priced at {int} cents")]
async fn product(world: &mut BuyOrderWorld, title: String, price: i64) {
    let product = NewProduct::new(world.merchant().id, title.as_str(), Cents::from(price));
    let product = world.db().upsert_product(product).await.expect("Error adding product").product;
    world.products.insert(title, product);
}
