//! Order placement for the shop backend.
//!
//! One call to [`CheckoutService::place_order`] produces exactly one
//! order or no order at all:
//! 1. Validate the request shape.
//! 2. Decrement stock per line through the conditional-write ledger.
//! 3. Generate a collision-free order number.
//! 4. Persist the header and line items under one transaction.
//!
//! If any step fails, stock decrements already applied in the same call
//! are compensated in reverse order before the failure is returned, so
//! no partial checkout is ever observable.
//!
//! Placing the same order twice is deliberately not idempotent: it
//! creates two orders and decrements stock twice. Deduplication is a
//! caller concern.

pub mod error;
pub mod order_no;
pub mod service;

pub use error::CheckoutError;
pub use order_no::generate_order_no;
pub use service::{CheckoutService, OrderLineRequest};
