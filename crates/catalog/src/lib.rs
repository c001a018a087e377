//! Catalog store for the storefront system.
//!
//! Owns the durable item records (name, price, stock level, category,
//! image) and the authoritative stock counts. Stock is only ever
//! decremented through [`CatalogStore::decrement_stock`], which applies an
//! atomic floor-checked compare-and-set so concurrent checkouts can never
//! drive stock negative.

pub mod error;
pub mod item;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{CatalogError, Result};
pub use item::{Item, NewItem};
pub use memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;
pub use store::{CatalogStore, CatalogStoreExt};
