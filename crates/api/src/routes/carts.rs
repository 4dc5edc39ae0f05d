//! Shopping cart endpoints. Carts are keyed by the user's account name.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ProductId;
use serde::{Deserialize, Serialize};
use storage::{CartEntry, CartStore, Page, PageRequest, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::resolve_user;

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    #[serde(default)]
    pub user_account: String,
    pub page_no: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub user_account: String,
    pub product_id: i64,
    pub quantity: u32,
}

/// One cart line joined with the current catalog entry. Prices reflect
/// the catalog now, not the moment the product was added.
#[derive(Serialize)]
pub struct CartItemResponse {
    pub product_id: i64,
    pub product_name: String,
    pub price_cents: i64,
    pub quantity: u32,
}

/// GET /api/cart — page a user's cart, joined with product details.
#[tracing::instrument(skip(state))]
pub async fn page<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<CartQuery>,
) -> Result<Json<Page<CartItemResponse>>, ApiError> {
    let user = resolve_user(&state.store, &query.user_account).await?;
    let request = PageRequest::new(query.page_no, query.page_size);
    let entries = CartStore::page_by_user(&state.store, user.user_id, request).await?;

    let mut items = Vec::with_capacity(entries.items.len());
    for entry in &entries.items {
        let product = state.store.get_product(entry.product_id).await?;
        let (name, price) = match product {
            Some(p) => (p.product_name, p.price.cents()),
            // The product was deleted after it was added to the cart.
            None => ("unknown product".to_string(), 0),
        };
        items.push(CartItemResponse {
            product_id: entry.product_id.as_i64(),
            product_name: name,
            price_cents: price,
            quantity: entry.quantity,
        });
    }

    Ok(Json(Page::new(entries.total, request, items)))
}

/// GET /api/cart/all — the whole cart at once, no paging. Used where
/// the caller needs every line, e.g. to pre-fill a checkout request.
#[tracing::instrument(skip(state))]
pub async fn list_all<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<CartQuery>,
) -> Result<Json<Vec<CartItemResponse>>, ApiError> {
    let user = resolve_user(&state.store, &query.user_account).await?;
    let entries = CartStore::list_by_user(&state.store, user.user_id).await?;

    let mut items = Vec::with_capacity(entries.len());
    for entry in &entries {
        let product = state.store.get_product(entry.product_id).await?;
        let (name, price) = match product {
            Some(p) => (p.product_name, p.price.cents()),
            None => ("unknown product".to_string(), 0),
        };
        items.push(CartItemResponse {
            product_id: entry.product_id.as_i64(),
            product_name: name,
            price_cents: price,
            quantity: entry.quantity,
        });
    }

    Ok(Json(items))
}

/// POST /api/cart/items — add a product to a cart. Adding a product
/// that is already present adds the quantities together.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddToCartRequest>,
) -> Result<StatusCode, ApiError> {
    if req.quantity == 0 {
        return Err(ApiError::BadRequest(
            "quantity must be positive".to_string(),
        ));
    }
    let user = resolve_user(&state.store, &req.user_account).await?;
    let product_id = ProductId::new(req.product_id);
    if state.store.get_product(product_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "product {product_id} not found"
        )));
    }

    state
        .store
        .upsert_entry(CartEntry {
            user_id: user.user_id,
            product_id,
            quantity: req.quantity,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/cart/items/{product_id} — remove one product from a cart.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<i64>,
    Query(query): Query<CartQuery>,
) -> Result<StatusCode, ApiError> {
    let user = resolve_user(&state.store, &query.user_account).await?;
    if state
        .store
        .remove_entry(user.user_id, ProductId::new(product_id))
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "product {product_id} is not in the cart"
        )))
    }
}

/// DELETE /api/cart — empty a user's cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<CartQuery>,
) -> Result<StatusCode, ApiError> {
    let user = resolve_user(&state.store, &query.user_account).await?;
    state.store.clear(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
