//! Merchant registration and lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::MerchantId;
use serde::{Deserialize, Serialize};
use storage::{Merchant, NewMerchant, Page, PageRequest, Store};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RegisterMerchantRequest {
    pub merchant_name: String,
    pub account: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct MerchantResponse {
    pub merchant_id: i64,
    pub merchant_name: String,
    pub account: String,
}

impl From<Merchant> for MerchantResponse {
    fn from(merchant: Merchant) -> Self {
        Self {
            merchant_id: merchant.merchant_id.as_i64(),
            merchant_name: merchant.merchant_name,
            account: merchant.account,
        }
    }
}

/// POST /api/merchants — register a seller.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterMerchantRequest>,
) -> Result<(StatusCode, Json<MerchantResponse>), ApiError> {
    if req.account.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "account and password are required".to_string(),
        ));
    }

    let merchant_id = state
        .store
        .insert_merchant(NewMerchant {
            merchant_name: req.merchant_name.clone(),
            account: req.account.clone(),
            password: req.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MerchantResponse {
            merchant_id: merchant_id.as_i64(),
            merchant_name: req.merchant_name,
            account: req.account,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SoldItemsQuery {
    pub page_no: Option<u32>,
    pub page_size: Option<u32>,
}

/// One sold line item joined with the current catalog entry. A product
/// deleted since the sale renders as "unknown product" with zero price.
#[derive(Serialize)]
pub struct SoldItemResponse {
    pub order_no: String,
    pub product_id: i64,
    pub product_name: String,
    pub price_cents: i64,
    pub quantity: u32,
}

/// GET /api/merchants/{id}/order-items — page everything this merchant
/// has sold, newest first.
#[tracing::instrument(skip(state))]
pub async fn sold_items<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Query(query): Query<SoldItemsQuery>,
) -> Result<Json<Page<SoldItemResponse>>, ApiError> {
    let merchant_id = MerchantId::new(id);
    if state.store.get_merchant(merchant_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("merchant {id} not found")));
    }

    let request = PageRequest::new(query.page_no, query.page_size);
    let lines = state.store.page_items_by_merchant(merchant_id, request).await?;

    let mut items = Vec::with_capacity(lines.items.len());
    for line in &lines.items {
        let product = state.store.get_product(line.product_id).await?;
        let (name, price) = match product {
            Some(p) => (p.product_name, p.price.cents()),
            None => ("unknown product".to_string(), 0),
        };
        items.push(SoldItemResponse {
            order_no: line.order_no.to_string(),
            product_id: line.product_id.as_i64(),
            product_name: name,
            price_cents: price,
            quantity: line.quantity,
        });
    }

    Ok(Json(Page::new(lines.total, request, items)))
}

/// GET /api/merchants/{id} — look up a seller.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<MerchantResponse>, ApiError> {
    let merchant = state
        .store
        .get_merchant(MerchantId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("merchant {id} not found")))?;

    Ok(Json(merchant.into()))
}
