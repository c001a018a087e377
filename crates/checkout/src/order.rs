use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use common::{Identity, ItemId, Money};

use crate::{OrderTotals, Result};

/// Unique identifier for a committed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One line of a committed order, priced from the catalog at validation
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Shipping details captured at commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// A committed order.
///
/// Recorded only after stock has been successfully decremented for every
/// line. The payment method is recorded verbatim; no payment processing
/// happens here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub identity: Identity,
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
    pub shipping: ShippingInfo,
    pub payment_method: String,
    pub placed_at: DateTime<Utc>,
}

/// Persistence seam for committed orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Records a committed order.
    async fn record(&self, order: Order) -> Result<()>;

    /// Retrieves an order by id.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists the orders placed by an identity, newest first.
    async fn list_for(&self, identity: &Identity) -> Result<Vec<Order>>;
}

/// In-memory order repository for testing and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded orders.
    pub fn order_count(&self) -> usize {
        self.orders.read().unwrap().len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn record(&self, order: Order) -> Result<()> {
        self.orders.write().unwrap().insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().unwrap().get(&id).cloned())
    }

    async fn list_for(&self, identity: &Identity) -> Result<Vec<Order>> {
        let orders = self.orders.read().unwrap();
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| o.identity == *identity)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
        Ok(matching)
    }
}
