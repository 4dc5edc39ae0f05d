//! Order number generation.
//!
//! An order number is a millisecond-resolution UTC timestamp
//! (`YYYYMMDDHHMMSSmmm`) followed by a 4-digit random suffix. The store
//! is probed for an existing order with the candidate number; on a
//! collision a fresh suffix is drawn, up to a fixed attempt bound.

use chrono::Utc;
use common::OrderNo;
use rand::Rng;
use storage::OrderStore;

use crate::error::{CheckoutError, Result};

/// Collision retries before giving up. A collision needs two orders in
/// the same millisecond with the same random suffix, so exhausting this
/// is statistically near-impossible, but it must still be an explicit
/// outcome.
const MAX_ATTEMPTS: u32 = 3;

/// Generates an order number guaranteed not to collide with any
/// existing order at probe time.
pub async fn generate_order_no<O: OrderStore + ?Sized>(orders: &O) -> Result<OrderNo> {
    for attempt in 1..=MAX_ATTEMPTS {
        let timestamp = Utc::now().format("%Y%m%d%H%M%S%3f");
        let suffix: u32 = rand::rng().random_range(1000..=9999);
        let candidate = OrderNo::new(format!("{timestamp}{suffix}"));

        match orders.get_order(&candidate).await {
            Ok(None) => return Ok(candidate),
            Ok(Some(_)) => {
                tracing::warn!(order_no = %candidate, attempt, "order number collision, retrying");
            }
            Err(e) => return Err(CheckoutError::PersistenceFailure(e.to_string())),
        }
    }

    Err(CheckoutError::GenerationExhausted)
}
