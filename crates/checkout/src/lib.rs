//! Checkout coordinator for the storefront system.
//!
//! Turns a cart snapshot into a committed order through a validate/commit
//! state machine. Validation re-reads the catalog for authoritative prices
//! and stock and reports every violation at once; commit takes stock with
//! atomic per-line decrements and rolls back on conflict, so stock can
//! never be oversold or go negative.

pub mod coordinator;
pub mod error;
pub mod order;
pub mod pricing;
pub mod state;

pub use coordinator::{Checkout, CheckoutCoordinator, PendingReservation};
pub use error::{CheckoutError, Result, StockViolation};
pub use order::{
    InMemoryOrderRepository, Order, OrderId, OrderLine, OrderRepository, ShippingInfo,
};
pub use pricing::{OrderTotals, PricingPolicy};
pub use state::CheckoutState;
