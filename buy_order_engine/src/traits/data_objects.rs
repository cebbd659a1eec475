use bo_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    db_types::{BuyOrderStatus, Product},
    traits::EscrowTotals,
};

/// The result of atomically changing a product's current price.
#[derive(Debug, Clone)]
pub struct PriceChange {
    /// The product, with the new current price.
    pub product: Product,
    pub old_price: Cents,
}

impl PriceChange {
    pub fn new_price(&self) -> Cents {
        self.product.current_price
    }

    pub fn is_drop(&self) -> bool {
        self.product.current_price < self.old_price
    }
}

#[derive(Debug, Clone)]
pub struct ProductUpsert {
    pub product: Product,
    pub created: bool,
    /// Set when an existing product's current price differs from the incoming price. The change has *not* been
    /// applied yet.
    pub pending_price: Option<Cents>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: BuyOrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProductDemand {
    pub product_id: i64,
    pub title: String,
    pub current_price: Cents,
    /// Buy orders that are still waiting on this product.
    pub monitoring_orders: i64,
    pub highest_target: Cents,
    pub average_target: Cents,
    pub held_amount: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantSummary {
    pub merchant_id: i64,
    pub order_counts: Vec<StatusCount>,
    pub total_orders: i64,
    pub escrow: EscrowTotals,
    pub product_count: i64,
    pub products: Vec<ProductDemand>,
}
