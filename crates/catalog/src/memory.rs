use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common::ItemId;

use crate::{CatalogError, CatalogStore, Item, NewItem, Result};

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    items: HashMap<ItemId, Item>,
}

/// In-memory catalog store for testing and local development.
///
/// Provides the same interface as the PostgreSQL implementation. The
/// decrement CAS is realized by holding the write lock across the
/// check-and-update, so concurrent checkouts observe the same all-or-nothing
/// behavior as the SQL floor-checked update.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of items in the catalog.
    pub fn item_count(&self) -> usize {
        self.state.read().unwrap().items.len()
    }

    /// Returns the current stock level for an item, if it exists.
    pub fn stock_of(&self, id: ItemId) -> Option<u32> {
        self.state.read().unwrap().items.get(&id).map(|i| i.stock_level)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list(&self) -> Result<Vec<Item>> {
        let state = self.state.read().unwrap();
        let mut items: Vec<_> = state.items.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.as_uuid().cmp(&b.id.as_uuid())));
        Ok(items)
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        let state = self.state.read().unwrap();
        Ok(state.items.get(&id).cloned())
    }

    async fn create(&self, new: NewItem) -> Result<Item> {
        new.validate()?;
        let item = new.into_item();
        let mut state = self.state.write().unwrap();
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update(&self, item: Item) -> Result<()> {
        item.validate()?;
        let mut state = self.state.write().unwrap();
        match state.items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item;
                Ok(())
            }
            None => Err(CatalogError::NotFound(item.id)),
        }
    }

    async fn delete(&self, id: ItemId) -> Result<()> {
        let mut state = self.state.write().unwrap();
        match state.items.remove(&id) {
            Some(_) => Ok(()),
            None => Err(CatalogError::NotFound(id)),
        }
    }

    async fn decrement_stock(&self, id: ItemId, quantity: u32) -> Result<()> {
        // Single write guard across check and update: the in-memory CAS.
        let mut state = self.state.write().unwrap();
        let item = state
            .items
            .get_mut(&id)
            .ok_or(CatalogError::NotFound(id))?;

        if item.stock_level < quantity {
            return Err(CatalogError::InsufficientStock {
                item_id: id,
                available: item.stock_level,
                requested: quantity,
            });
        }

        item.stock_level -= quantity;
        Ok(())
    }

    async fn restock(&self, id: ItemId, quantity: u32) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let item = state
            .items
            .get_mut(&id)
            .ok_or(CatalogError::NotFound(id))?;
        item.stock_level += quantity;
        Ok(())
    }
}
