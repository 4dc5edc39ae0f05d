//! Order placement and order history.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use checkout::OrderLineRequest;
use common::{MerchantId, Money, ProductId};
use serde::{Deserialize, Serialize};
use storage::{OrderStore, Page, PageRequest, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::resolve_user;

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub user_account: String,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: u32,
    pub merchant_id: i64,
}

#[derive(Serialize)]
pub struct OrderPlacedResponse {
    pub order_no: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    #[serde(default)]
    pub user_account: String,
    pub page_no: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_no: String,
    pub created_at: String,
    pub total_cents: i64,
    pub items: Vec<OrderItemResponse>,
}

/// A line item joined with the current catalog entry. The catalog may
/// have moved on since the order was placed; missing products render as
/// "unknown product" with a zero price.
#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: i64,
    pub product_name: String,
    pub price_cents: i64,
    pub quantity: u32,
    pub merchant_id: i64,
}

/// POST /api/orders — run checkout for the given lines.
#[tracing::instrument(skip(state, req))]
pub async fn place<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderPlacedResponse>), ApiError> {
    let user = resolve_user(&state.store, &req.user_account).await?;
    let lines: Vec<OrderLineRequest> = req
        .items
        .into_iter()
        .map(|item| OrderLineRequest {
            product_id: ProductId::new(item.product_id),
            quantity: item.quantity,
            merchant_id: MerchantId::new(item.merchant_id),
        })
        .collect();

    let order_no = state.checkout.place_order(user.user_id, &lines).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderPlacedResponse {
            order_no: order_no.to_string(),
        }),
    ))
}

/// GET /api/orders — page a user's orders, newest first, each order
/// joined with its line items and a computed total.
#[tracing::instrument(skip(state))]
pub async fn page<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Page<OrderResponse>>, ApiError> {
    let user = resolve_user(&state.store, &query.user_account).await?;
    let request = PageRequest::new(query.page_no, query.page_size);
    let headers = OrderStore::page_by_user(&state.store, user.user_id, request).await?;

    let mut orders = Vec::with_capacity(headers.items.len());
    for header in &headers.items {
        let lines = state.store.items_for_order(&header.order_no).await?;
        let mut total = Money::zero();
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let product = state.store.get_product(line.product_id).await?;
            let (name, price) = match product {
                Some(p) => (p.product_name, p.price),
                None => ("unknown product".to_string(), Money::zero()),
            };
            total = total + price.times(line.quantity);
            items.push(OrderItemResponse {
                product_id: line.product_id.as_i64(),
                product_name: name,
                price_cents: price.cents(),
                quantity: line.quantity,
                merchant_id: line.merchant_id.as_i64(),
            });
        }
        orders.push(OrderResponse {
            order_no: header.order_no.to_string(),
            created_at: header.created_at.to_rfc3339(),
            total_cents: total.cents(),
            items,
        });
    }

    Ok(Json(Page::new(headers.total, request, orders)))
}
