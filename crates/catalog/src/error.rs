use thiserror::Error;

use common::ItemId;

/// Errors that can occur when interacting with the catalog store.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The item does not exist in the catalog.
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// A stock decrement would have driven the level below zero.
    #[error(
        "Insufficient stock for item {item_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        item_id: ItemId,
        available: u32,
        requested: u32,
    },

    /// An item record failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
