use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{ItemId, Money};

use crate::{CartError, Result};

/// A single line in a cart: one item at a captured name and unit price.
///
/// The name and price are display copies taken when the line was added.
/// They are never authoritative; checkout re-reads the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(item_id: ItemId, name: impl Into<String>, unit_price: Money, quantity: u32) -> Self {
        Self {
            item_id,
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Unit price multiplied by quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// The in-memory cart for one identity.
///
/// Lines are keyed by item id, so adding an item that is already present
/// merges quantities instead of creating a second line. The total is
/// recomputed from the lines after every mutation and is never read back
/// from storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: HashMap<ItemId, CartLine>,
    total: Money,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item to the cart, merging quantities if it is already present.
    ///
    /// A merge keeps the name and unit price captured by the first add.
    /// Fails with `InvalidQuantity` when `quantity` is zero.
    pub fn add_item(&mut self, line: CartLine) -> Result<()> {
        if line.quantity == 0 {
            return Err(CartError::InvalidQuantity {
                quantity: line.quantity,
            });
        }

        match self.lines.get_mut(&line.item_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => {
                self.lines.insert(line.item_id, line);
            }
        }
        self.recompute_total();
        Ok(())
    }

    /// Sets the quantity of an existing line, clamping to a minimum of 1.
    ///
    /// Updating never removes a line; removal is only ever explicit via
    /// [`remove_item`](Cart::remove_item). Returns the quantity actually
    /// applied. Fails with `ItemNotInCart` if the item has no line.
    pub fn update_quantity(&mut self, item_id: ItemId, quantity: u32) -> Result<u32> {
        let applied = quantity.max(1);
        let line = self
            .lines
            .get_mut(&item_id)
            .ok_or(CartError::ItemNotInCart { item_id })?;
        line.quantity = applied;
        self.recompute_total();
        Ok(applied)
    }

    /// Removes a line. Removing an item that is not present is a no-op.
    pub fn remove_item(&mut self, item_id: ItemId) {
        if self.lines.remove(&item_id).is_some() {
            self.recompute_total();
        }
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.total = Money::zero();
    }

    /// Drops every line whose item id fails the `exists` check.
    ///
    /// Returns the ids that were pruned. Used when a loaded cart is
    /// reconciled against the current catalog.
    pub fn prune_missing<F>(&mut self, exists: F) -> Vec<ItemId>
    where
        F: Fn(ItemId) -> bool,
    {
        let pruned: Vec<ItemId> = self
            .lines
            .keys()
            .copied()
            .filter(|id| !exists(*id))
            .collect();
        for id in &pruned {
            self.lines.remove(id);
        }
        if !pruned.is_empty() {
            self.recompute_total();
        }
        pruned
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn line(&self, item_id: ItemId) -> Option<&CartLine> {
        self.lines.get(&item_id)
    }

    pub fn quantity_of(&self, item_id: ItemId) -> Option<u32> {
        self.lines.get(&item_id).map(|l| l.quantity)
    }

    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    /// Point-in-time copy of the cart. Later mutations do not affect it.
    pub fn snapshot(&self) -> CartSnapshot {
        let mut lines: Vec<CartLine> = self.lines.values().cloned().collect();
        lines.sort_by(|a, b| a.name.cmp(&b.name).then(a.item_id.as_uuid().cmp(&b.item_id.as_uuid())));
        CartSnapshot {
            lines,
            total: self.total,
            taken_at: Utc::now(),
        }
    }

    fn recompute_total(&mut self) {
        self.total = self.lines.values().map(CartLine::line_total).sum();
    }
}

/// Immutable point-in-time view of a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub total: Money,
    pub taken_at: DateTime<Utc>,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
