//! Shopping cart engine and persistence for the storefront system.
//!
//! A cart belongs to exactly one identity (an authenticated user or an
//! anonymous session) and holds display copies of item names and prices.
//! Those copies are never trusted at checkout; the checkout coordinator
//! re-reads the catalog for authoritative data.

pub mod cart;
pub mod error;
pub mod postgres;
pub mod service;
pub mod store;

pub use cart::{Cart, CartLine, CartSnapshot};
pub use error::{CartError, Result};
pub use postgres::PostgresCartStore;
pub use service::{CartChanged, CartService};
pub use store::{CartStore, InMemoryCartStore, StoredCart, StoredCartLine};
