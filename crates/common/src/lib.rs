//! Shared types for the shop backend.
//!
//! Every store and service speaks in these newtypes rather than raw
//! integers, so a user id can never be passed where a merchant id is
//! expected.

pub mod types;

pub use types::{MerchantId, Money, OrderNo, ProductId, UserId};
