//! HTTP API server for the shop backend.
//!
//! Thin handlers only: every handler validates parameters, resolves the
//! acting user, and delegates to the storage traits or the checkout
//! orchestrator. Structured logging (tracing) and Prometheus metrics
//! come as layers.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use checkout::CheckoutService;
use metrics_exporter_prometheus::PrometheusHandle;
use storage::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub checkout: CheckoutService<S, S>,
}

/// Builds the application state over one storage backend.
pub fn create_state<S: Store + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        checkout: CheckoutService::new(store.clone(), store.clone()),
        store,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/api/products",
            post(routes::products::create::<S>).get(routes::products::search::<S>),
        )
        .route(
            "/api/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::remove::<S>),
        )
        .route(
            "/api/products/{id}/shelf",
            put(routes::products::set_shelf::<S>),
        )
        .route(
            "/api/cart",
            get(routes::carts::page::<S>).delete(routes::carts::clear::<S>),
        )
        .route("/api/cart/all", get(routes::carts::list_all::<S>))
        .route("/api/cart/items", post(routes::carts::add::<S>))
        .route(
            "/api/cart/items/{product_id}",
            delete(routes::carts::remove::<S>),
        )
        .route(
            "/api/orders",
            post(routes::orders::place::<S>).get(routes::orders::page::<S>),
        )
        .route("/api/users", post(routes::users::register::<S>))
        .route("/api/users/{account}", get(routes::users::get::<S>))
        .route("/api/merchants", post(routes::merchants::register::<S>))
        .route("/api/merchants/{id}", get(routes::merchants::get::<S>))
        .route(
            "/api/merchants/{id}/order-items",
            get(routes::merchants::sold_items::<S>),
        )
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
