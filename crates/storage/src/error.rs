use common::{OrderNo, ProductId};
use thiserror::Error;

/// Errors that can occur in the persistence layer.
///
/// The first three variants are the stock ledger's explicit outcomes:
/// callers inspect them, they are not control flow for anything else.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No product row exists for the given id.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The product's stock at read time was below the requested quantity.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// The conditional stock write affected zero rows: another writer
    /// changed the stock between our read and our write.
    #[error("concurrent stock update on product {0}")]
    StockConflict(ProductId),

    /// An order header with this number already exists.
    #[error("order number {0} already exists")]
    DuplicateOrderNo(OrderNo),

    /// A user or merchant account name is already taken.
    #[error("account {0} already exists")]
    DuplicateAccount(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
