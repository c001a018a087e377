//! HTTP API server with observability for the storefront system.
//!
//! Provides REST endpoints for catalog management, carts, checkout, and
//! auth, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cart::{CartService, CartStore, InMemoryCartStore};
use catalog::{CatalogStore, InMemoryCatalogStore};
use checkout::{CheckoutCoordinator, InMemoryOrderRepository};

use auth::{AuthService, InMemoryUserStore};

/// Shared application state accessible from all handlers.
pub struct AppState<S: CartStore, C: CatalogStore> {
    pub catalog: Arc<C>,
    pub carts: CartService<S, C>,
    pub checkout: CheckoutCoordinator<C, InMemoryOrderRepository>,
    pub orders: Arc<InMemoryOrderRepository>,
    pub auth: AuthService<InMemoryUserStore>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CartStore + 'static, C: CatalogStore + 'static>(
    state: Arc<AppState<S, C>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/items", get(routes::items::list::<S, C>))
        .route("/items", post(routes::items::create::<S, C>))
        .route("/items/{id}", get(routes::items::get::<S, C>))
        .route("/items/{id}", put(routes::items::update::<S, C>))
        .route("/items/{id}", axum::routing::delete(routes::items::delete::<S, C>))
        .route("/cart", get(routes::cart::get::<S, C>))
        .route("/cart", axum::routing::delete(routes::cart::clear::<S, C>))
        .route("/cart/items", post(routes::cart::add_item::<S, C>))
        .route("/cart/items/{id}", put(routes::cart::update_quantity::<S, C>))
        .route(
            "/cart/items/{id}",
            axum::routing::delete(routes::cart::remove_item::<S, C>),
        )
        .route("/checkout", post(routes::checkout::place_order::<S, C>))
        .route("/auth/register", post(routes::auth::register::<S, C>))
        .route("/auth/login", post(routes::auth::login::<S, C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over explicit cart and catalog backends.
pub fn create_state<S: CartStore, C: CatalogStore>(
    cart_store: S,
    catalog: Arc<C>,
) -> Arc<AppState<S, C>> {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let carts = CartService::new(cart_store, Arc::clone(&catalog));
    let checkout = CheckoutCoordinator::new(Arc::clone(&catalog), Arc::clone(&orders));

    Arc::new(AppState {
        catalog,
        carts,
        checkout,
        orders,
        auth: AuthService::new(InMemoryUserStore::new()),
    })
}

/// Creates the default all-in-memory application state.
pub fn create_default_state() -> Arc<AppState<InMemoryCartStore, InMemoryCatalogStore>> {
    create_state(
        InMemoryCartStore::new(),
        Arc::new(InMemoryCatalogStore::new()),
    )
}
