use std::str::FromStr;

use bo_common::Cents;
use buy_order_engine::{
    db_types::{BuyOrderStatus, EscrowStatus, NewDiscount, NotificationKind, PriceChangeSource, Recipient},
    order_objects::{Actor, NewBuyOrderRequest},
    test_utils::mock_processor::Fault,
    traits::IntentStatus,
    NotificationManagement,
    ProcessorError,
};
use chrono::{Duration, Utc};
use cucumber::{then, when};

use crate::cucumber::BuyOrderWorld;

fn request(world: &BuyOrderWorld, product: &str, target: i64) -> NewBuyOrderRequest {
    NewBuyOrderRequest {
        product_id: world.product(product).id,
        target_price: Cents::from(target),
        payment_method: "pm_card_visa".into(),
        expires_in_days: None,
    }
}

#[when(expr = "'{word}' places a buy order for '{word}' at {int} cents")]
async fn place_order(world: &mut BuyOrderWorld, name: String, product: String, target: i64) {
    let req = request(world, &product, target);
    let customer_id = world.customer(&name).id;
    let placed = world.api().create_buy_order(customer_id, req).await.expect("Error placing buy order");
    world.orders.insert(name, placed.order.id);
}

#[when(expr = "'{word}' tries to place a buy order for '{word}' at {int} cents")]
async fn try_place_order(world: &mut BuyOrderWorld, name: String, product: String, target: i64) {
    let req = request(world, &product, target);
    let customer_id = world.customer(&name).id;
    match world.api().create_buy_order(customer_id, req).await {
        Ok(placed) => {
            world.orders.insert(name, placed.order.id);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "the processor declines the next hold")]
async fn decline_next_hold(world: &mut BuyOrderWorld) {
    world.system().processor.fail_next_hold(Fault::Reject(ProcessorError::Declined("card_declined".into())));
}

#[when(expr = "new holds need further action")]
async fn holds_need_action(world: &mut BuyOrderWorld) {
    world.system().processor.set_hold_status(IntentStatus::RequiresAction);
}

#[when(expr = "the next capture fails")]
async fn fail_next_capture(world: &mut BuyOrderWorld) {
    world.system().processor.fail_next_capture(Fault::Reject(ProcessorError::Rejected("card_expired".into())));
}

#[when(expr = "the price of '{word}' changes to {int} cents")]
async fn change_price(world: &mut BuyOrderWorld, product: String, price: i64) {
    let id = world.product(&product).id;
    world
        .api()
        .process_price_change(id, Cents::from(price), PriceChangeSource::Webhook)
        .await
        .expect("Error processing price change");
}

#[when(expr = "'{word}' cancels their buy order")]
async fn cancel_order(world: &mut BuyOrderWorld, name: String) {
    let order = world.order_of(&name).await;
    let actor = Actor::Customer(world.customer(&name).id);
    match world.api().cancel_buy_order(order.id, actor).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "the buy order of '{word}' passes its expiry date")]
async fn lapse_order(world: &mut BuyOrderWorld, name: String) {
    let order = world.order_of(&name).await;
    sqlx::query("UPDATE buy_orders SET expires_at = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::minutes(1))
        .bind(order.id)
        .execute(world.db().pool())
        .await
        .expect("Error updating expiry");
}

#[when(expr = "the expiry worker runs")]
async fn run_expiry(world: &mut BuyOrderWorld) {
    world.api().expire_due_orders().await.expect("Error expiring buy orders");
}

#[when(expr = "the merchant offers '{word}' at {int} cents for {int} buy orders")]
async fn issue_discount(world: &mut BuyOrderWorld, product: String, price: i64, uses: i64) {
    let discount = NewDiscount {
        product_id: world.product(&product).id,
        discount_price: Cents::from(price),
        max_uses: Some(uses),
        ..Default::default()
    };
    world.api().issue_discount(world.merchant().id, discount).await.expect("Error issuing discount");
}

#[then(expr = "the attempt fails with {string}")]
async fn attempt_failed(world: &mut BuyOrderWorld, message: String) {
    let err = world.last_error.as_deref().expect("The last attempt did not fail");
    assert!(err.contains(&message), "Expected an error containing '{message}', got '{err}'");
}

#[then(expr = "'{word}' has no buy orders")]
async fn no_orders(world: &mut BuyOrderWorld, name: String) {
    let orders = world.api().orders_for_customer(world.customer(&name).id).await.expect("Error fetching orders");
    assert!(orders.is_empty(), "{name} has {} buy orders", orders.len());
}

#[then(expr = "the buy order of '{word}' is {word}")]
async fn order_status(world: &mut BuyOrderWorld, name: String, status: String) {
    let expected = BuyOrderStatus::from_str(&status).expect("Not a buy order status");
    let order = world.order_of(&name).await;
    assert_eq!(order.status, expected, "Buy order of {name} is {}", order.status);
}

#[then(expr = "the buy order of '{word}' was filled at {int} cents")]
async fn order_filled_at(world: &mut BuyOrderWorld, name: String, price: i64) {
    let order = world.order_of(&name).await;
    assert_eq!(order.fulfilled_price, Some(Cents::from(price)));
}

#[then(expr = "the escrow of '{word}' holds {int} cents with a platform fee of {int} and a merchant share of {int}")]
async fn escrow_held(world: &mut BuyOrderWorld, name: String, amount: i64, fee: i64, share: i64) {
    let order = world.order_of(&name).await;
    let escrow = world.api().escrow_for_order(order.id).await.expect("Error fetching escrow").expect("No escrow");
    assert_eq!(escrow.status, EscrowStatus::Held);
    assert_eq!(escrow.escrow_amount, Cents::from(amount));
    assert_eq!(escrow.platform_fee, Cents::from(fee));
    assert_eq!(escrow.merchant_share, Cents::from(share));
}

#[then(expr = "the escrow of '{word}' released {int} cents with a platform fee of {int} and a merchant share of {int}")]
async fn escrow_released(world: &mut BuyOrderWorld, name: String, amount: i64, fee: i64, share: i64) {
    let order = world.order_of(&name).await;
    let escrow = world.api().escrow_for_order(order.id).await.expect("Error fetching escrow").expect("No escrow");
    assert_eq!(escrow.status, EscrowStatus::Released);
    assert_eq!(escrow.captured_amount, Some(Cents::from(amount)));
    assert_eq!(escrow.platform_fee, Cents::from(fee));
    assert_eq!(escrow.merchant_share, Cents::from(share));
}

#[then(expr = "the escrow of '{word}' is refunded")]
async fn escrow_refunded(world: &mut BuyOrderWorld, name: String) {
    let order = world.order_of(&name).await;
    let escrow = world.api().escrow_for_order(order.id).await.expect("Error fetching escrow").expect("No escrow");
    assert_eq!(escrow.status, EscrowStatus::Refunded);
    assert_eq!(escrow.captured_amount, None);
}

#[then(expr = "'{word}' was notified of {string}")]
async fn customer_notified(world: &mut BuyOrderWorld, name: String, kinds: String) {
    let recipient = Recipient::customer(world.customer(&name).id);
    check_notifications(world, recipient, &kinds).await;
}

#[then(expr = "the merchant was notified of {string}")]
async fn merchant_notified(world: &mut BuyOrderWorld, kinds: String) {
    let recipient = Recipient::merchant(world.merchant().id);
    check_notifications(world, recipient, &kinds).await;
}

async fn check_notifications(world: &BuyOrderWorld, recipient: Recipient, kinds: &str) {
    let expected = kinds
        .split(',')
        .map(|k| NotificationKind::from_str(k.trim()).expect("Not a notification kind"))
        .collect::<Vec<_>>();
    let mut actual = world
        .db()
        .notifications_for(recipient)
        .await
        .expect("Error fetching notifications")
        .into_iter()
        .map(|n| n.kind)
        .collect::<Vec<_>>();
    actual.reverse();
    assert_eq!(actual, expected);
}

#[then(expr = "{int} holds were released at the processor")]
async fn holds_released(world: &mut BuyOrderWorld, count: usize) {
    assert_eq!(world.system().processor.cancels().len(), count);
}
