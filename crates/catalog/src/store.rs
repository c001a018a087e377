use async_trait::async_trait;

use common::ItemId;

use crate::{Item, NewItem, Result};

/// Core trait for catalog store implementations.
///
/// The catalog owns authoritative price and stock data. All
/// implementations must be thread-safe (Send + Sync), and
/// [`decrement_stock`](CatalogStore::decrement_stock) must be atomic with
/// respect to concurrent callers: it either applies the full decrement
/// while stock covers it, or fails without mutating anything.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Lists all items.
    async fn list(&self) -> Result<Vec<Item>>;

    /// Retrieves an item by ID.
    ///
    /// Returns None if the item doesn't exist.
    async fn get(&self, id: ItemId) -> Result<Option<Item>>;

    /// Creates a new item and returns the stored record with its ID.
    async fn create(&self, new: NewItem) -> Result<Item>;

    /// Replaces an existing item record.
    ///
    /// Fails with `NotFound` if the item doesn't exist.
    async fn update(&self, item: Item) -> Result<()>;

    /// Deletes an item.
    ///
    /// Fails with `NotFound` if the item doesn't exist.
    async fn delete(&self, id: ItemId) -> Result<()>;

    /// Atomically decrements stock by `quantity` with a floor check.
    ///
    /// Equivalent to
    /// `UPDATE items SET stock_level = stock_level - q WHERE id = ? AND stock_level >= q`
    /// with the affected-row count verified. Fails with
    /// `InsufficientStock` (carrying the observed available count) when
    /// stock does not cover the request, or `NotFound` if the item is gone.
    /// Stock can never go negative through this operation.
    async fn decrement_stock(&self, id: ItemId, quantity: u32) -> Result<()>;

    /// Adds `quantity` back to stock.
    ///
    /// Used to roll back already-applied decrements when a multi-line
    /// checkout hits a conflict partway through.
    async fn restock(&self, id: ItemId, quantity: u32) -> Result<()>;
}

/// Extension trait providing convenience methods for catalog stores.
#[async_trait]
pub trait CatalogStoreExt: CatalogStore {
    /// Checks whether an item exists.
    async fn exists(&self, id: ItemId) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }
}

// Blanket implementation for all CatalogStore implementations
impl<T: CatalogStore + ?Sized> CatalogStoreExt for T {}
