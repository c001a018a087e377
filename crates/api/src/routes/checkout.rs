//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cart::CartStore;
use catalog::CatalogStore;
use checkout::{Order, OrderLine, ShippingInfo};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::caller_identity;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping: ShippingRequest,
    pub payment_method: String,
}

#[derive(Debug, Deserialize)]
pub struct ShippingRequest {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl From<ShippingRequest> for ShippingInfo {
    fn from(req: ShippingRequest) -> Self {
        Self {
            full_name: req.full_name,
            address: req.address,
            city: req.city,
            state: req.state,
            zip_code: req.zip_code,
        }
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub state: String,
    pub lines: Vec<OrderLineResponse>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub grand_total_cents: i64,
    pub payment_method: String,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: u32,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id.to_string(),
            state: "Committed".to_string(),
            lines: order.lines.iter().map(OrderLineResponse::from).collect(),
            subtotal_cents: order.totals.subtotal.cents(),
            tax_cents: order.totals.tax.cents(),
            shipping_cents: order.totals.shipping.cents(),
            grand_total_cents: order.totals.grand_total.cents(),
            payment_method: order.payment_method,
            placed_at: order.placed_at,
        }
    }
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            id: line.item_id.to_string(),
            name: line.name.clone(),
            price_cents: line.unit_price.cents(),
            quantity: line.quantity,
        }
    }
}

// -- Handlers --

/// POST /checkout — validate and commit the caller's cart in one call.
///
/// On success the order is returned, stock is decremented, and the cart is
/// cleared. Validation failures come back as 409 with the full violation
/// list; a commit-time stock race comes back as a 409 conflict and the
/// client can re-validate.
#[tracing::instrument(skip(state, headers, req))]
pub async fn place_order<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let identity = caller_identity(&headers)?;
    let snapshot = state.carts.snapshot(&identity).await?;

    let mut attempt = state.checkout.begin(identity, snapshot)?;
    state.checkout.validate(&mut attempt).await?;
    let order = state
        .checkout
        .commit(&mut attempt, req.shipping.into(), req.payment_method, &state.carts)
        .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}
