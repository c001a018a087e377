use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::{Identity, ItemId, Money};

use crate::{Cart, CartError, CartLine, Result};

/// Persisted wire form of one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCartLine {
    pub id: ItemId,
    pub name: String,
    /// Unit price in cents.
    pub price: Money,
    pub quantity: u32,
}

/// Persisted wire form of a cart: `{"items": [...], "total": n}`.
///
/// The stored total is written for inspection only. Loading recomputes the
/// total from the lines and ignores the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCart {
    pub items: Vec<StoredCartLine>,
    pub total: Money,
}

impl StoredCart {
    /// Rebuilds a live cart from the stored form.
    ///
    /// Zero-quantity lines (which should never have been written) are
    /// dropped rather than rejected, and the total is recomputed.
    pub fn into_cart(self) -> Cart {
        let mut cart = Cart::new();
        for line in self.items {
            if line.quantity == 0 {
                continue;
            }
            // Cannot fail: quantity is non-zero and ids are distinct per line
            // or merge harmlessly.
            let _ = cart.add_item(CartLine::new(line.id, line.name, line.price, line.quantity));
        }
        cart
    }
}

impl From<&Cart> for StoredCart {
    fn from(cart: &Cart) -> Self {
        let snapshot = cart.snapshot();
        Self {
            items: snapshot
                .lines
                .into_iter()
                .map(|l| StoredCartLine {
                    id: l.item_id,
                    name: l.name,
                    price: l.unit_price,
                    quantity: l.quantity,
                })
                .collect(),
            total: snapshot.total,
        }
    }
}

/// Core trait for cart persistence, keyed by identity.
///
/// One record per identity storage key. Implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Writes the cart for an identity, replacing any previous record.
    async fn save(&self, identity: &Identity, cart: &StoredCart) -> Result<()>;

    /// Loads the cart for an identity. Returns None if none was saved.
    async fn load(&self, identity: &Identity) -> Result<Option<StoredCart>>;

    /// Deletes the cart record for an identity. Deleting a missing record
    /// is a no-op.
    async fn delete(&self, identity: &Identity) -> Result<()>;
}

/// In-memory cart store for testing and local development.
///
/// Failure toggles let tests exercise the persistence-failure paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<String, StoredCart>>>,
    fail_on_save: Arc<AtomicBool>,
    fail_on_load: Arc<AtomicBool>,
    fail_on_delete: Arc<AtomicBool>,
    fail_saves_for: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every save fails with a retryable persistence error.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.fail_on_save.store(fail, Ordering::SeqCst);
    }

    /// When set, every load fails with a retryable persistence error.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.fail_on_load.store(fail, Ordering::SeqCst);
    }

    /// When set, every delete fails with a retryable persistence error.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.fail_on_delete.store(fail, Ordering::SeqCst);
    }

    /// When set, saves for this one identity fail while everything else
    /// goes through.
    pub fn set_fail_on_save_for(&self, identity: &Identity, fail: bool) {
        let mut keys = self.fail_saves_for.write().unwrap();
        if fail {
            keys.insert(identity.storage_key());
        } else {
            keys.remove(&identity.storage_key());
        }
    }

    /// Number of stored cart records.
    pub fn record_count(&self) -> usize {
        self.carts.read().unwrap().len()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn save(&self, identity: &Identity, cart: &StoredCart) -> Result<()> {
        if self.fail_on_save.load(Ordering::SeqCst)
            || self
                .fail_saves_for
                .read()
                .unwrap()
                .contains(&identity.storage_key())
        {
            return Err(CartError::Persistence(
                "simulated save failure".to_string(),
            ));
        }
        self.carts
            .write()
            .unwrap()
            .insert(identity.storage_key(), cart.clone());
        Ok(())
    }

    async fn load(&self, identity: &Identity) -> Result<Option<StoredCart>> {
        if self.fail_on_load.load(Ordering::SeqCst) {
            return Err(CartError::Persistence(
                "simulated load failure".to_string(),
            ));
        }
        Ok(self
            .carts
            .read()
            .unwrap()
            .get(&identity.storage_key())
            .cloned())
    }

    async fn delete(&self, identity: &Identity) -> Result<()> {
        if self.fail_on_delete.load(Ordering::SeqCst) {
            return Err(CartError::Persistence(
                "simulated delete failure".to_string(),
            ));
        }
        self.carts.write().unwrap().remove(&identity.storage_key());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SessionId;

    fn sample_cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_item(CartLine::new(
            ItemId::new(),
            "Widget",
            Money::from_cents(1000),
            2,
        ))
        .unwrap();
        cart
    }

    #[test]
    fn wire_shape_matches_persisted_representation() {
        let id = ItemId::new();
        let mut cart = Cart::new();
        cart.add_item(CartLine::new(id, "Widget", Money::from_cents(1250), 2))
            .unwrap();

        let stored = StoredCart::from(&cart);
        let json = serde_json::to_value(&stored).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "items": [{
                    "id": id.as_uuid(),
                    "name": "Widget",
                    "price": 1250,
                    "quantity": 2
                }],
                "total": 2500
            })
        );
    }

    #[test]
    fn into_cart_recomputes_total() {
        let stored = StoredCart {
            items: vec![StoredCartLine {
                id: ItemId::new(),
                name: "Widget".to_string(),
                price: Money::from_cents(1000),
                quantity: 3,
            }],
            // Stale stored total is ignored.
            total: Money::from_cents(1),
        };
        let cart = stored.into_cart();
        assert_eq!(cart.total().cents(), 3000);
    }

    #[test]
    fn into_cart_drops_zero_quantity_lines() {
        let stored = StoredCart {
            items: vec![StoredCartLine {
                id: ItemId::new(),
                name: "Ghost".to_string(),
                price: Money::from_cents(1000),
                quantity: 0,
            }],
            total: Money::zero(),
        };
        assert!(stored.into_cart().is_empty());
    }

    #[tokio::test]
    async fn save_load_round_trip() {
        let store = InMemoryCartStore::new();
        let identity = Identity::Anonymous(SessionId::new());
        let stored = StoredCart::from(&sample_cart());

        store.save(&identity, &stored).await.unwrap();
        let loaded = store.load(&identity).await.unwrap().unwrap();
        assert_eq!(loaded, stored);
    }

    #[tokio::test]
    async fn identities_are_isolated() {
        let store = InMemoryCartStore::new();
        let a = Identity::Anonymous(SessionId::new());
        let b = Identity::Anonymous(SessionId::new());

        store
            .save(&a, &StoredCart::from(&sample_cart()))
            .await
            .unwrap();

        assert!(store.load(&b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryCartStore::new();
        let identity = Identity::Anonymous(SessionId::new());

        store
            .save(&identity, &StoredCart::from(&sample_cart()))
            .await
            .unwrap();
        store.delete(&identity).await.unwrap();
        store.delete(&identity).await.unwrap();
        assert!(store.load(&identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fail_on_save_is_retryable() {
        let store = InMemoryCartStore::new();
        let identity = Identity::Anonymous(SessionId::new());
        store.set_fail_on_save(true);

        let result = store.save(&identity, &StoredCart::from(&sample_cart())).await;
        assert!(matches!(result, Err(ref e) if e.is_retryable()));

        store.set_fail_on_save(false);
        store
            .save(&identity, &StoredCart::from(&sample_cart()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fail_on_load_is_retryable() {
        let store = InMemoryCartStore::new();
        let identity = Identity::Anonymous(SessionId::new());
        store
            .save(&identity, &StoredCart::from(&sample_cart()))
            .await
            .unwrap();

        store.set_fail_on_load(true);
        let result = store.load(&identity).await;
        assert!(matches!(result, Err(ref e) if e.is_retryable()));

        store.set_fail_on_load(false);
        assert!(store.load(&identity).await.unwrap().is_some());
    }
}
