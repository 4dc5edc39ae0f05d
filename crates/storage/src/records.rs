//! Entity records mirroring the database schema.

use chrono::{DateTime, Utc};
use common::{MerchantId, Money, OrderNo, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A product listed by a merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_desc: String,
    /// Available quantity. Never negative; mutated only by catalog
    /// updates and the conditional stock decrement.
    pub stock: i64,
    /// Opaque reference to the product image; image storage lives elsewhere.
    pub product_pic: String,
    pub price: Money,
    pub on_shelf: bool,
    pub merchant_id: MerchantId,
}

/// Fields for creating a product; the key is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub product_name: String,
    pub product_desc: String,
    pub stock: i64,
    pub product_pic: String,
    pub price: Money,
    pub on_shelf: bool,
    pub merchant_id: MerchantId,
}

/// One order header per successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeader {
    pub order_no: OrderNo,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A persisted product line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: i64,
    pub order_no: OrderNo,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Merchant attribution at order time, denormalized from the request.
    pub merchant_id: MerchantId,
}

/// A line to persist as part of order placement; id and order number
/// are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub merchant_id: MerchantId,
}

/// One product in one user's cart. The (user, product) pair is unique;
/// adding the same product again adds to the quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A shop customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub account: String,
    pub username: String,
    /// Stored opaque; authentication is out of scope.
    pub password: String,
}

/// Fields for registering a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub account: String,
    pub username: String,
    pub password: String,
}

/// A seller owning products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    pub account: String,
    pub password: String,
}

/// Fields for registering a merchant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMerchant {
    pub merchant_name: String,
    pub account: String,
    pub password: String,
}
