use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{ItemId, Money};

use crate::error::CatalogError;

/// A catalog item record.
///
/// Owned by the catalog store; price and stock level here are the
/// authoritative values. Cart lines carry denormalized copies for display
/// only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique, stable identifier.
    pub id: ItemId,

    /// Display name.
    pub name: String,

    /// Optional long description.
    pub description: Option<String>,

    /// Unit price in cents. Never negative.
    pub price: Money,

    /// Units currently in stock. Never negative.
    pub stock_level: u32,

    /// Optional category label.
    pub category: Option<String>,

    /// Optional image URL.
    pub image_url: Option<String>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a new catalog item; the store assigns the ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock_level: u32,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl NewItem {
    /// Creates a new item description with the required fields.
    pub fn new(name: impl Into<String>, price: Money, stock_level: u32) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
            stock_level,
            category: None,
            image_url: None,
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the image URL.
    pub fn image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Validates the record: non-empty name, non-negative price.
    pub fn validate(&self) -> Result<(), CatalogError> {
        validate_fields(&self.name, self.price)
    }

    /// Builds the full item record with a freshly assigned ID.
    pub fn into_item(self) -> Item {
        Item {
            id: ItemId::new(),
            name: self.name,
            description: self.description,
            price: self.price,
            stock_level: self.stock_level,
            category: self.category,
            image_url: self.image_url,
            created_at: Utc::now(),
        }
    }
}

impl Item {
    /// Validates the record: non-empty name, non-negative price.
    pub fn validate(&self) -> Result<(), CatalogError> {
        validate_fields(&self.name, self.price)
    }
}

fn validate_fields(name: &str, price: Money) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::Validation("name cannot be empty".to_string()));
    }
    if price.is_negative() {
        return Err(CatalogError::Validation(format!(
            "price cannot be negative: {price}"
        )));
    }
    Ok(())
}
