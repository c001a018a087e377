//! Identity-keyed cart repository.
//!
//! The service owns the live carts (one per identity), persists every
//! mutation through a [`CartStore`], and broadcasts change notifications so
//! any number of observers can track cart state without sharing a mutable
//! singleton.
//!
//! Mutations follow a clone-persist-swap discipline: the live cart is
//! cloned, the clone is mutated and saved, and only a successful save swaps
//! the clone in. A failed save therefore leaves the visible cart at its
//! last valid state and the caller gets a retryable error.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use catalog::CatalogStore;
use common::{Identity, ItemId, Money, SessionId, UserId};

use crate::{Cart, CartError, CartLine, CartSnapshot, CartStore, Result, StoredCart};

/// Broadcast notification emitted after every successful cart mutation.
#[derive(Debug, Clone)]
pub struct CartChanged {
    pub identity: Identity,
    pub snapshot: CartSnapshot,
}

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Cart service generic over its persistence and catalog backends.
pub struct CartService<S: CartStore, C: CatalogStore> {
    store: Arc<S>,
    catalog: Arc<C>,
    live: Arc<RwLock<HashMap<String, Cart>>>,
    events: broadcast::Sender<CartChanged>,
}

impl<S: CartStore, C: CatalogStore> Clone for CartService<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
            live: Arc::clone(&self.live),
            events: self.events.clone(),
        }
    }
}

impl<S: CartStore, C: CatalogStore> CartService<S, C> {
    /// Creates a new cart service over the given store and catalog.
    pub fn new(store: S, catalog: Arc<C>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: Arc::new(store),
            catalog,
            live: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    /// Subscribes to cart-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CartChanged> {
        self.events.subscribe()
    }

    /// Returns a point-in-time snapshot of the identity's cart.
    #[tracing::instrument(skip(self))]
    pub async fn snapshot(&self, identity: &Identity) -> Result<CartSnapshot> {
        let cart = self.load_cart(identity).await?;
        Ok(cart.snapshot())
    }

    /// Adds `quantity` of a catalog item to the identity's cart.
    ///
    /// The item's current name and price are captured into the new line for
    /// display. An add of an item already in the cart merges quantities.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        identity: &Identity,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<CartSnapshot> {
        let item = self
            .catalog
            .get(item_id)
            .await?
            .ok_or(CartError::Catalog(catalog::CatalogError::NotFound(item_id)))?;

        let snapshot = self
            .mutate(identity, |cart| {
                cart.add_item(CartLine::new(item.id, item.name.clone(), item.price, quantity))
            })
            .await?;

        metrics::counter!("cart_items_added").increment(u64::from(quantity));
        Ok(snapshot)
    }

    /// Sets the quantity of a line, clamped to a minimum of 1.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        identity: &Identity,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<CartSnapshot> {
        self.mutate(identity, |cart| {
            cart.update_quantity(item_id, quantity).map(|_| ())
        })
        .await
    }

    /// Removes a line. Removing an absent item is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, identity: &Identity, item_id: ItemId) -> Result<CartSnapshot> {
        self.mutate(identity, |cart| {
            cart.remove_item(item_id);
            Ok(())
        })
        .await
    }

    /// Empties the identity's cart and deletes its persisted record.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, identity: &Identity) -> Result<CartSnapshot> {
        self.store.delete(identity).await?;

        let snapshot = {
            let mut live = self.live.write().unwrap();
            let cart = live.entry(identity.storage_key()).or_default();
            cart.clear();
            cart.snapshot()
        };

        self.notify(identity, snapshot.clone());
        Ok(snapshot)
    }

    /// Folds an anonymous session's cart into a user's cart at login.
    ///
    /// Quantities merge per the usual add rules and the merged cart is
    /// persisted under the user identity. The anonymous record is deleted
    /// before the merged cart is saved, and restored if that save fails, so
    /// a retried merge never finds both the merged cart and the anonymous
    /// record and doubles quantities.
    #[tracing::instrument(skip(self))]
    pub async fn merge_on_login(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<CartSnapshot> {
        let anon = Identity::Anonymous(session_id);
        let user = Identity::User(user_id);

        let anon_cart = self.load_cart(&anon).await?;
        let mut merged = self.load_cart(&user).await?;

        for line in anon_cart.lines() {
            if line.quantity == 0 {
                continue;
            }
            // Infallible: quantity checked above.
            let _ = merged.add_item(line.clone());
        }

        self.store.delete(&anon).await?;
        if let Err(e) = self.store.save(&user, &StoredCart::from(&merged)).await {
            // Put the anonymous record back so the whole merge can retry.
            if let Err(restore) = self.store.save(&anon, &StoredCart::from(&anon_cart)).await {
                tracing::error!(
                    error = %restore,
                    "failed to restore anonymous cart after merge save failure"
                );
            }
            return Err(e);
        }

        let snapshot = merged.snapshot();
        {
            let mut live = self.live.write().unwrap();
            live.insert(user.storage_key(), merged);
            live.remove(&anon.storage_key());
        }

        metrics::counter!("cart_merges").increment(1);
        self.notify(&user, snapshot.clone());
        Ok(snapshot)
    }

    /// Current total of the identity's cart.
    pub async fn total(&self, identity: &Identity) -> Result<Money> {
        Ok(self.load_cart(identity).await?.total())
    }

    /// Applies `op` to a clone of the live cart, persists the result, and
    /// swaps it in only if the save succeeded.
    async fn mutate<F>(&self, identity: &Identity, op: F) -> Result<CartSnapshot>
    where
        F: FnOnce(&mut Cart) -> Result<()>,
    {
        let mut cart = self.load_cart(identity).await?;
        op(&mut cart)?;

        self.store.save(identity, &StoredCart::from(&cart)).await?;

        let snapshot = cart.snapshot();
        self.live
            .write()
            .unwrap()
            .insert(identity.storage_key(), cart);

        self.notify(identity, snapshot.clone());
        Ok(snapshot)
    }

    /// Returns the live cart for an identity, loading and reconciling it
    /// from storage on first access.
    ///
    /// Reconciliation silently prunes lines whose items are no longer in
    /// the catalog; the pruned cart is written back so the stale lines do
    /// not resurface on the next load.
    async fn load_cart(&self, identity: &Identity) -> Result<Cart> {
        let key = identity.storage_key();
        if let Some(cart) = self.live.read().unwrap().get(&key) {
            return Ok(cart.clone());
        }

        let mut cart = self
            .store
            .load(identity)
            .await?
            .map(StoredCart::into_cart)
            .unwrap_or_default();

        let mut missing = Vec::new();
        for line in cart.lines() {
            if self.catalog.get(line.item_id).await?.is_none() {
                missing.push(line.item_id);
            }
        }
        if !missing.is_empty() {
            for id in missing {
                tracing::debug!(item_id = %id, "pruning stale cart line");
                cart.remove_item(id);
            }
            metrics::counter!("cart_lines_pruned").increment(1);
            if let Err(e) = self.store.save(identity, &StoredCart::from(&cart)).await {
                // The in-memory cart is already reconciled; the write-back
                // can be retried by any later mutation.
                tracing::warn!(error = %e, "failed to persist reconciled cart");
            }
        }

        self.live.write().unwrap().insert(key, cart.clone());
        Ok(cart)
    }

    fn notify(&self, identity: &Identity, snapshot: CartSnapshot) {
        // Send fails only when no subscribers exist, which is fine.
        let _ = self.events.send(CartChanged {
            identity: *identity,
            snapshot,
        });
    }
}
