//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{MerchantId, Money, ProductId};
use serde::{Deserialize, Serialize};
use storage::{NewProduct, Page, PageRequest, Product, Store};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub product_name: String,
    #[serde(default)]
    pub product_desc: String,
    pub stock: i64,
    #[serde(default)]
    pub product_pic: String,
    pub price_cents: i64,
    pub merchant_id: i64,
}

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub product_name: String,
    #[serde(default)]
    pub product_desc: String,
    pub stock: i64,
    #[serde(default)]
    pub product_pic: String,
    pub price_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct ShelfRequest {
    pub on_shelf: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub merchant_id: Option<i64>,
    pub name: Option<String>,
    pub page_no: Option<u32>,
    pub page_size: Option<u32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub product_id: i64,
    pub product_name: String,
    pub product_desc: String,
    pub stock: i64,
    pub product_pic: String,
    pub price_cents: i64,
    pub on_shelf: bool,
    pub merchant_id: i64,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            product_id: p.product_id.as_i64(),
            product_name: p.product_name,
            product_desc: p.product_desc,
            stock: p.stock,
            product_pic: p.product_pic,
            price_cents: p.price.cents(),
            on_shelf: p.on_shelf,
            merchant_id: p.merchant_id.as_i64(),
        }
    }
}

#[derive(Serialize)]
pub struct ProductCreatedResponse {
    pub product_id: i64,
}

// -- Handlers --

/// POST /api/products — list a new product.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductCreatedResponse>), ApiError> {
    if req.product_name.trim().is_empty() {
        return Err(ApiError::BadRequest("product name is required".to_string()));
    }
    if req.stock < 0 {
        return Err(ApiError::BadRequest("stock cannot be negative".to_string()));
    }
    if req.price_cents < 0 {
        return Err(ApiError::BadRequest("price cannot be negative".to_string()));
    }
    let merchant_id = MerchantId::new(req.merchant_id);
    if !merchant_id.is_valid() {
        return Err(ApiError::BadRequest("merchant id is invalid".to_string()));
    }
    if state.store.get_merchant(merchant_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "merchant {merchant_id} not found"
        )));
    }

    let product_id = state
        .store
        .insert_product(NewProduct {
            product_name: req.product_name,
            product_desc: req.product_desc,
            stock: req.stock,
            product_pic: req.product_pic,
            price: Money::from_cents(req.price_cents),
            on_shelf: true,
            merchant_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductCreatedResponse {
            product_id: product_id.as_i64(),
        }),
    ))
}

/// GET /api/products/{id} — look up one product.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .store
        .get_product(ProductId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))?;

    Ok(Json(product.into()))
}

/// PUT /api/products/{id} — update a product's catalog fields.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    if req.stock < 0 {
        return Err(ApiError::BadRequest("stock cannot be negative".to_string()));
    }

    let mut product = state
        .store
        .get_product(ProductId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))?;

    product.product_name = req.product_name;
    product.product_desc = req.product_desc;
    product.stock = req.stock;
    product.product_pic = req.product_pic;
    product.price = Money::from_cents(req.price_cents);

    state.store.update_product(&product).await?;
    Ok(Json(product.into()))
}

/// DELETE /api/products/{id} — delete a product.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_product(ProductId::new(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("product {id} not found")))
    }
}

/// PUT /api/products/{id}/shelf — put a product on or off the shelf.
#[tracing::instrument(skip(state))]
pub async fn set_shelf<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(req): Json<ShelfRequest>,
) -> Result<StatusCode, ApiError> {
    if state
        .store
        .set_shelf_status(ProductId::new(id), req.on_shelf)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("product {id} not found")))
    }
}

/// GET /api/products — page products by merchant or by name substring.
#[tracing::instrument(skip(state))]
pub async fn search<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<ProductResponse>>, ApiError> {
    let page = PageRequest::new(query.page_no, query.page_size);

    let result = match (query.merchant_id, query.name) {
        (Some(merchant_id), _) => {
            state
                .store
                .page_by_merchant(MerchantId::new(merchant_id), page)
                .await?
        }
        (None, Some(name)) => state.store.page_by_name(&name, page).await?,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either merchant_id or name is required".to_string(),
            ));
        }
    };

    Ok(Json(result.map(ProductResponse::from)))
}
