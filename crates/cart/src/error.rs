use thiserror::Error;

use common::ItemId;

/// Errors that can occur in cart operations.
#[derive(Error, Debug)]
pub enum CartError {
    /// The requested quantity is not usable (zero on add).
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },

    /// A quantity update targeted an item that is not in the cart.
    #[error("Item {item_id} is not in the cart")]
    ItemNotInCart { item_id: ItemId },

    /// The backing store failed to persist or load the cart.
    ///
    /// The visible cart is left at its last valid state when this is
    /// returned from a mutation, so the caller can simply retry.
    #[error("Cart persistence failed: {0}")]
    Persistence(String),

    /// Catalog lookup failed while resolving an item for the cart.
    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CartError {
    /// Whether the operation can be retried without changing its arguments.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Result type for cart operations.
pub type Result<T> = std::result::Result<T, CartError>;
