//! Shared value types for the storefront system.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{Identity, ItemId, SessionId, UserId};
