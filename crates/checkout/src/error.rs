//! Checkout error taxonomy.

use common::ProductId;
use thiserror::Error;

/// The single outcome surface of a `place_order` call.
///
/// Every storage failure is mapped into one of these at the orchestrator
/// boundary; no raw database error reaches the caller. Stock-related
/// failures carry the offending product id.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request shape is invalid; nothing was touched.
    #[error("invalid checkout request: {0}")]
    InvalidRequest(String),

    /// A requested product does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// A line requested more than the available stock.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// A concurrent checkout won the stock race on this product.
    /// Transient: the caller may retry the whole order from scratch.
    /// Retrying only the failed line is unsafe because the other lines
    /// were already compensated.
    #[error("concurrent stock update on product {0}")]
    Conflict(ProductId),

    /// All attempts at a unique order number collided.
    #[error("could not generate a collision-free order number")]
    GenerationExhausted,

    /// Header or line-item persistence failed; stock was compensated.
    #[error("order persistence failed: {0}")]
    PersistenceFailure(String),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
