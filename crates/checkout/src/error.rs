use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::ItemId;

use crate::CheckoutState;

/// One reason a cart line failed validation against the catalog.
///
/// Validation checks every line and reports all violations together, so
/// the buyer can fix the whole cart in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StockViolation {
    /// Requested quantity exceeds what the catalog currently has.
    InsufficientStock {
        item_id: ItemId,
        available: u32,
        requested: u32,
    },
    /// The item no longer exists in the catalog.
    ItemNotFound { item_id: ItemId },
}

impl std::fmt::Display for StockViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockViolation::InsufficientStock {
                item_id,
                available,
                requested,
            } => write!(
                f,
                "item {item_id}: requested {requested}, only {available} available"
            ),
            StockViolation::ItemNotFound { item_id } => {
                write!(f, "item {item_id}: no longer in the catalog")
            }
        }
    }
}

/// Errors that can occur during checkout.
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Checkout was opened against an empty cart.
    #[error("Cannot check out an empty cart")]
    EmptyCart,

    /// Validation found one or more violations; all are reported.
    #[error("Cart validation failed with {} violation(s)", .0.len())]
    ValidationFailed(Vec<StockViolation>),

    /// A concurrent checkout took the stock between validate and commit.
    #[error("Stock conflict on item {item_id}: requested {requested}, only {available} left")]
    Conflict {
        item_id: ItemId,
        available: u32,
        requested: u32,
    },

    /// The requested operation is not legal in the checkout's current state.
    #[error("Operation not allowed in {state} state")]
    InvalidState { state: CheckoutState },

    /// Catalog access failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    /// Cart access failed.
    #[error("Cart error: {0}")]
    Cart(#[from] cart::CartError),

    /// Writing the order record failed. The commit is rolled back and the
    /// whole checkout can be retried.
    #[error("Order store error: {0}")]
    OrderStore(String),
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
