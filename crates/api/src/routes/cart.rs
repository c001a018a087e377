//! Cart endpoints.
//!
//! The caller's identity comes from the `X-User-Id` or `X-Session-Id`
//! header; each identity has exactly one cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use cart::{CartSnapshot, CartStore};
use catalog::CatalogStore;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::{caller_identity, items::parse_item_id};

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: u32,
    pub line_total_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    pub total_cents: i64,
}

impl From<CartSnapshot> for CartResponse {
    fn from(snapshot: CartSnapshot) -> Self {
        Self {
            items: snapshot
                .lines
                .iter()
                .map(|l| CartLineResponse {
                    id: l.item_id.to_string(),
                    name: l.name.clone(),
                    price_cents: l.unit_price.cents(),
                    quantity: l.quantity,
                    line_total_cents: l.line_total().cents(),
                })
                .collect(),
            total_cents: snapshot.total.cents(),
        }
    }
}

// -- Handlers --

/// GET /cart — the caller's current cart.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = caller_identity(&headers)?;
    let snapshot = state.carts.snapshot(&identity).await?;
    Ok(Json(snapshot.into()))
}

/// POST /cart/items — add an item to the caller's cart.
#[tracing::instrument(skip(state, headers, req))]
pub async fn add_item<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let identity = caller_identity(&headers)?;
    let item_id = parse_item_id(&req.item_id)?;
    let snapshot = state.carts.add_item(&identity, item_id, req.quantity).await?;
    Ok((StatusCode::CREATED, Json(snapshot.into())))
}

/// PUT /cart/items/:id — set a line's quantity (clamped to at least 1).
#[tracing::instrument(skip(state, headers, req))]
pub async fn update_quantity<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = caller_identity(&headers)?;
    let item_id = parse_item_id(&id)?;
    let snapshot = state
        .carts
        .update_quantity(&identity, item_id, req.quantity)
        .await?;
    Ok(Json(snapshot.into()))
}

/// DELETE /cart/items/:id — remove a line. A no-op if the line is absent.
#[tracing::instrument(skip(state, headers))]
pub async fn remove_item<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = caller_identity(&headers)?;
    let item_id = parse_item_id(&id)?;
    let snapshot = state.carts.remove_item(&identity, item_id).await?;
    Ok(Json(snapshot.into()))
}

/// DELETE /cart — empty the caller's cart.
#[tracing::instrument(skip(state, headers))]
pub async fn clear<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let identity = caller_identity(&headers)?;
    state.carts.clear(&identity).await?;
    Ok(StatusCode::NO_CONTENT)
}
