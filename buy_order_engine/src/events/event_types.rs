use serde::{Deserialize, Serialize};

use crate::db_types::{BuyOrder, BuyOrderStatus, EscrowPayment, Notification, PriceAlert, Product};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: BuyOrder,
    pub escrow: EscrowPayment,
}

impl OrderCreatedEvent {
    pub fn new(order: BuyOrder, escrow: EscrowPayment) -> Self {
        Self { order, escrow }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFulfilledEvent {
    pub order: BuyOrder,
    pub escrow: EscrowPayment,
}

impl OrderFulfilledEvent {
    pub fn new(order: BuyOrder, escrow: EscrowPayment) -> Self {
        Self { order, escrow }
    }
}

/// Emitted when a buy order is cancelled or expires and its hold is released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: BuyOrder,
    pub status: BuyOrderStatus,
}

impl OrderAnnulledEvent {
    pub fn new(order: BuyOrder) -> Self {
        let status = order.status;
        Self { order, status }
    }
}

/// Emitted for every in-app notification, so that it can also be delivered by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub notification: Notification,
    /// The recipient's email address, if it is known.
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlertTriggeredEvent {
    pub alert: PriceAlert,
    pub product: Product,
}

#[derive(Debug, Clone)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderFulfilled(OrderFulfilledEvent),
    OrderAnnulled(OrderAnnulledEvent),
    Notification(NotificationEvent),
    PriceAlertTriggered(PriceAlertTriggeredEvent),
}
