//! Catalog item CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cart::CartStore;
use catalog::{CatalogStore, Item, NewItem};
use common::{ItemId, Money};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_level: u32,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_level: u32,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_level: u32,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name,
            description: item.description,
            price_cents: item.price.cents(),
            stock_level: item.stock_level,
            category: item.category,
            image_url: item.image_url,
        }
    }
}

// -- Handlers --

/// GET /items — list all catalog items.
#[tracing::instrument(skip(state))]
pub async fn list<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = state.catalog.list().await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// GET /items/:id — fetch one item.
#[tracing::instrument(skip(state))]
pub async fn get<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let id = parse_item_id(&id)?;
    let item = state
        .catalog
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {id} not found")))?;
    Ok(Json(item.into()))
}

/// POST /items — create an item.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let mut new = NewItem::new(req.name, Money::from_cents(req.price_cents), req.stock_level);
    if let Some(description) = req.description {
        new = new.description(description);
    }
    if let Some(category) = req.category {
        new = new.category(category);
    }
    if let Some(image_url) = req.image_url {
        new = new.image_url(image_url);
    }

    let item = state.catalog.create(new).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// PUT /items/:id — replace an item record.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let id = parse_item_id(&id)?;
    let mut item = state
        .catalog
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {id} not found")))?;

    item.name = req.name;
    item.description = req.description;
    item.price = Money::from_cents(req.price_cents);
    item.stock_level = req.stock_level;
    item.category = req.category;
    item.image_url = req.image_url;

    state.catalog.update(item.clone()).await?;
    Ok(Json(item.into()))
}

/// DELETE /items/:id — remove an item from the catalog.
///
/// Carts that still reference the item are reconciled lazily: stale lines
/// are pruned when each cart is next loaded.
#[tracing::instrument(skip(state))]
pub async fn delete<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_item_id(&id)?;
    state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn parse_item_id(id: &str) -> Result<ItemId, ApiError> {
    Uuid::parse_str(id)
        .map(ItemId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid item id: {e}")))
}
