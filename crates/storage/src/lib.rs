//! Persistence layer for the shop backend.
//!
//! This crate owns everything that touches durable state:
//! - entity records ([`records`])
//! - repository traits ([`store`]) for products (catalog + stock ledger),
//!   orders, carts, users, and merchants
//! - a PostgreSQL implementation ([`PgStore`]) backed by sqlx
//! - an in-memory implementation ([`MemoryStore`]) with identical
//!   observable semantics, used by tests and local runs
//!
//! The one non-CRUD operation is `ProductStore::decrement_stock`: a
//! read-then-conditional-write that only commits if the stock value is
//! unchanged since the read, so two concurrent checkouts can never
//! oversell a product.

pub mod error;
pub mod memory;
pub mod page;
pub mod postgres;
pub mod records;
pub mod store;

pub use error::{Result, StorageError};
pub use memory::MemoryStore;
pub use page::{Page, PageRequest};
pub use postgres::PgStore;
pub use records::{
    CartEntry, Merchant, NewMerchant, NewOrderLineItem, NewProduct, NewUser, OrderHeader,
    OrderLineItem, Product, User,
};
pub use store::{CartStore, MerchantStore, OrderStore, ProductStore, Store, UserStore};
