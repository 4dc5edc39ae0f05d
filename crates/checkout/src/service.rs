//! Checkout orchestrator.

use common::{MerchantId, OrderNo, ProductId, UserId};
use storage::{NewOrderLineItem, OrderStore, ProductStore, StorageError};

use crate::error::{CheckoutError, Result};
use crate::order_no::generate_order_no;

/// One requested product line of a checkout.
///
/// The merchant id is caller-supplied and denormalized onto the order
/// line verbatim, as the catalog's merchant attribution may change after
/// the order is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub merchant_id: MerchantId,
}

/// Drives the order-placement workflow: validate, decrement stock per
/// line, generate an order number, persist header and lines.
///
/// Stores are injected at construction; the service holds no other
/// state, so one instance serves any number of concurrent requests.
pub struct CheckoutService<P, O> {
    products: P,
    orders: O,
}

impl<P, O> CheckoutService<P, O>
where
    P: ProductStore,
    O: OrderStore,
{
    /// Creates a checkout service over the given stores.
    pub fn new(products: P, orders: O) -> Self {
        Self { products, orders }
    }

    /// Places an order for `user_id`, or changes nothing.
    ///
    /// Lines are processed in submission order. On any failure, stock
    /// decrements already applied by this call are compensated in
    /// reverse order before the error is returned; the caller never
    /// observes a partially placed order. Deliberately not idempotent:
    /// calling twice with identical input creates two orders.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        lines: &[OrderLineRequest],
    ) -> Result<OrderNo> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let start = std::time::Instant::now();

        // 1. Fail fast before touching storage.
        validate_request(user_id, lines)?;

        // 2. Reserve stock line by line, remembering what to undo.
        let mut applied: Vec<(ProductId, u32)> = Vec::with_capacity(lines.len());
        for line in lines {
            match self
                .products
                .decrement_stock(line.product_id, line.quantity)
                .await
            {
                Ok(_) => applied.push((line.product_id, line.quantity)),
                Err(e) => {
                    self.compensate(&applied).await;
                    return Err(self.fail(start, stock_error_to_checkout(e)));
                }
            }
        }

        // 3. Order number. Exhaustion is fatal for this attempt; the
        // decrements above must still be undone.
        let order_no = match generate_order_no(&self.orders).await {
            Ok(no) => no,
            Err(e) => {
                self.compensate(&applied).await;
                return Err(self.fail(start, e));
            }
        };

        // 4. Header + line items, one transaction.
        let items: Vec<NewOrderLineItem> = lines
            .iter()
            .map(|line| NewOrderLineItem {
                product_id: line.product_id,
                quantity: line.quantity,
                merchant_id: line.merchant_id,
            })
            .collect();

        if let Err(e) = self.orders.insert_order(&order_no, user_id, &items).await {
            self.compensate(&applied).await;
            return Err(self.fail(start, CheckoutError::PersistenceFailure(e.to_string())));
        }

        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        metrics::counter!("checkout_completed").increment(1);
        tracing::info!(%order_no, %user_id, line_count = lines.len(), "order placed");

        Ok(order_no)
    }

    /// Undoes stock decrements in reverse application order.
    ///
    /// A failed compensation is logged and skipped rather than returned:
    /// it must not mask the failure that triggered it, and the remaining
    /// lines still deserve their restore attempt.
    async fn compensate(&self, applied: &[(ProductId, u32)]) {
        for (product_id, quantity) in applied.iter().rev() {
            if let Err(e) = self.products.increment_stock(*product_id, *quantity).await {
                tracing::error!(
                    %product_id,
                    quantity,
                    error = %e,
                    "stock compensation failed, stock may be understated"
                );
            }
        }
    }

    fn fail(&self, start: std::time::Instant, e: CheckoutError) -> CheckoutError {
        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        metrics::counter!("checkout_failed").increment(1);
        tracing::warn!(error = %e, "checkout failed");
        e
    }
}

fn validate_request(user_id: UserId, lines: &[OrderLineRequest]) -> Result<()> {
    if !user_id.is_valid() {
        return Err(CheckoutError::InvalidRequest(format!(
            "user id {user_id} is not a valid identifier"
        )));
    }
    if lines.is_empty() {
        return Err(CheckoutError::InvalidRequest(
            "order line list is empty".to_string(),
        ));
    }
    for line in lines {
        if !line.product_id.is_valid() {
            return Err(CheckoutError::InvalidRequest(format!(
                "product id {} is not a valid identifier",
                line.product_id
            )));
        }
        if line.quantity == 0 {
            return Err(CheckoutError::InvalidRequest(format!(
                "quantity for product {} must be positive",
                line.product_id
            )));
        }
        if !line.merchant_id.is_valid() {
            return Err(CheckoutError::InvalidRequest(format!(
                "merchant id {} for product {} is not a valid identifier",
                line.merchant_id, line.product_id
            )));
        }
    }
    Ok(())
}

fn stock_error_to_checkout(e: StorageError) -> CheckoutError {
    match e {
        StorageError::ProductNotFound(id) => CheckoutError::ProductNotFound(id),
        StorageError::InsufficientStock {
            product_id,
            requested,
            available,
        } => CheckoutError::InsufficientStock {
            product_id,
            requested,
            available,
        },
        StorageError::StockConflict(id) => CheckoutError::Conflict(id),
        other => CheckoutError::PersistenceFailure(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{MerchantId, Money};
    use storage::{MemoryStore, NewProduct};

    fn service(store: &MemoryStore) -> CheckoutService<MemoryStore, MemoryStore> {
        CheckoutService::new(store.clone(), store.clone())
    }

    async fn seed_product(store: &MemoryStore, stock: i64) -> ProductId {
        store
            .insert_product(NewProduct {
                product_name: "Widget".to_string(),
                product_desc: String::new(),
                stock,
                product_pic: String::new(),
                price: Money::from_cents(1000),
                on_shelf: true,
                merchant_id: MerchantId::new(10),
            })
            .await
            .unwrap()
    }

    fn line(product_id: ProductId, quantity: u32) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
            merchant_id: MerchantId::new(10),
        }
    }

    async fn stock_of(store: &MemoryStore, id: ProductId) -> i64 {
        store.get_product(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn happy_path_creates_header_and_items_and_decrements_stock() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5).await;

        let order_no = service(&store)
            .place_order(UserId::new(1), &[line(product, 3)])
            .await
            .unwrap();

        assert_eq!(stock_of(&store, product).await, 2);
        assert_eq!(store.order_count().await, 1);

        let items = store.items_for_order(&order_no).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, product);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].merchant_id, MerchantId::new(10));
    }

    #[tokio::test]
    async fn multi_line_order_decrements_every_product() {
        let store = MemoryStore::new();
        let a = seed_product(&store, 5).await;
        let b = seed_product(&store, 8).await;

        let order_no = service(&store)
            .place_order(UserId::new(1), &[line(a, 2), line(b, 4)])
            .await
            .unwrap();

        assert_eq!(stock_of(&store, a).await, 3);
        assert_eq!(stock_of(&store, b).await, 4);
        assert_eq!(store.items_for_order(&order_no).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn insufficient_stock_fails_and_leaves_stock_unchanged() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 2).await;

        let err = service(&store)
            .place_order(UserId::new(1), &[line(product, 3)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert_eq!(stock_of(&store, product).await, 2);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn failing_second_line_compensates_the_first() {
        let store = MemoryStore::new();
        let a = seed_product(&store, 5).await;
        let b = seed_product(&store, 0).await;

        let err = service(&store)
            .place_order(UserId::new(1), &[line(a, 1), line(b, 1)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { product_id, .. } if product_id == b
        ));
        // The first line's decrement was rolled back.
        assert_eq!(stock_of(&store, a).await, 5);
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.order_item_count().await, 0);
    }

    #[tokio::test]
    async fn missing_product_fails_whole_order() {
        let store = MemoryStore::new();
        let a = seed_product(&store, 5).await;

        let err = service(&store)
            .place_order(UserId::new(1), &[line(a, 1), line(ProductId::new(999), 1)])
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ProductNotFound(id) if id == ProductId::new(999)));
        assert_eq!(stock_of(&store, a).await, 5);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn stock_conflict_fails_whole_order_without_retry() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5).await;

        store.set_conflict_on_next_decrement().await;
        let err = service(&store)
            .place_order(UserId::new(1), &[line(product, 1)])
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Conflict(id) if id == product));
        assert_eq!(stock_of(&store, product).await, 5);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn persistence_failure_compensates_all_decrements() {
        let store = MemoryStore::new();
        let a = seed_product(&store, 5).await;
        let b = seed_product(&store, 8).await;

        store.set_fail_on_next_order_insert().await;
        let err = service(&store)
            .place_order(UserId::new(1), &[line(a, 2), line(b, 4)])
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::PersistenceFailure(_)));
        assert_eq!(stock_of(&store, a).await, 5);
        assert_eq!(stock_of(&store, b).await, 8);
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.order_item_count().await, 0);
    }

    #[tokio::test]
    async fn invalid_requests_fail_before_touching_storage() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5).await;
        let svc = service(&store);

        let cases: Vec<(UserId, Vec<OrderLineRequest>)> = vec![
            (UserId::new(0), vec![line(product, 1)]),
            (UserId::new(1), vec![]),
            (UserId::new(1), vec![line(ProductId::new(0), 1)]),
            (UserId::new(1), vec![line(product, 0)]),
            (
                UserId::new(1),
                vec![OrderLineRequest {
                    product_id: product,
                    quantity: 1,
                    merchant_id: MerchantId::new(-3),
                }],
            ),
        ];

        for (user_id, lines) in cases {
            let err = svc.place_order(user_id, &lines).await.unwrap_err();
            assert!(matches!(err, CheckoutError::InvalidRequest(_)));
        }

        assert_eq!(stock_of(&store, product).await, 5);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn placing_twice_is_not_idempotent() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 10).await;
        let svc = service(&store);

        let first = svc
            .place_order(UserId::new(1), &[line(product, 2)])
            .await
            .unwrap();
        let second = svc
            .place_order(UserId::new(1), &[line(product, 2)])
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(store.order_count().await, 2);
        assert_eq!(stock_of(&store, product).await, 6);
    }

    #[tokio::test]
    async fn concurrent_checkouts_cannot_oversell() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5).await;

        let svc1 = service(&store);
        let svc2 = service(&store);
        let lines1 = [line(product, 3)];
        let lines2 = [line(product, 3)];

        let (r1, r2) = tokio::join!(
            svc1.place_order(UserId::new(1), &lines1),
            svc2.place_order(UserId::new(2), &lines2)
        );

        let wins = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
        assert!(wins <= 1);
        for r in [r1, r2] {
            if let Err(e) = r {
                assert!(matches!(
                    e,
                    CheckoutError::InsufficientStock { .. } | CheckoutError::Conflict(_)
                ));
            }
        }

        let final_stock = stock_of(&store, product).await;
        assert!(final_stock >= 0);
        assert_eq!(final_stock, 5 - 3 * wins as i64);
        assert_eq!(store.order_count().await, wins);
    }
}
