use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{MerchantId, OrderNo, ProductId, UserId};
use tokio::sync::RwLock;

use crate::error::{Result, StorageError};
use crate::page::{Page, PageRequest};
use crate::records::{
    CartEntry, Merchant, NewMerchant, NewOrderLineItem, NewProduct, NewUser, OrderHeader,
    OrderLineItem, Product, User,
};
use crate::store::{CartStore, MerchantStore, OrderStore, ProductStore, UserStore};

#[derive(Default)]
struct Inner {
    products: BTreeMap<i64, Product>,
    next_product_id: i64,
    orders: Vec<OrderHeader>,
    order_items: Vec<OrderLineItem>,
    next_item_id: i64,
    carts: BTreeMap<(i64, i64), u32>,
    users: BTreeMap<i64, User>,
    next_user_id: i64,
    merchants: BTreeMap<i64, Merchant>,
    next_merchant_id: i64,
    conflict_next_decrement: bool,
    fail_next_order_insert: bool,
}

/// In-memory store implementation for tests and local runs.
///
/// Observable behavior matches [`PgStore`](crate::PgStore), including the
/// stock ledger's explicit outcomes and the all-or-nothing order insert.
/// Two extra hooks exist for tests only: one makes the next conditional
/// stock write report a conflict (a lost compare-and-swap cannot be
/// provoked naturally here because the whole decrement runs under one
/// write lock), the other makes the next order insert fail.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `decrement_stock` fail with `StockConflict`.
    pub async fn set_conflict_on_next_decrement(&self) {
        self.inner.write().await.conflict_next_decrement = true;
    }

    /// Makes the next `insert_order` fail with a database error.
    pub async fn set_fail_on_next_order_insert(&self) {
        self.inner.write().await.fail_next_order_insert = true;
    }

    /// Returns the number of persisted order headers.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    /// Returns the number of persisted order line items.
    pub async fn order_item_count(&self) -> usize {
        self.inner.read().await.order_items.len()
    }
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let slice = items
        .iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    Page::new(total, page, slice)
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let inner = self.inner.read().await;
        Ok(inner.products.get(&product_id.as_i64()).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<ProductId> {
        let mut inner = self.inner.write().await;
        inner.next_product_id += 1;
        let id = inner.next_product_id;
        inner.products.insert(
            id,
            Product {
                product_id: ProductId::new(id),
                product_name: product.product_name,
                product_desc: product.product_desc,
                stock: product.stock,
                product_pic: product.product_pic,
                price: product.price,
                on_shelf: product.on_shelf,
                merchant_id: product.merchant_id,
            },
        );
        Ok(ProductId::new(id))
    }

    async fn update_product(&self, product: &Product) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.products.get_mut(&product.product_id.as_i64()) {
            Some(existing) => {
                *existing = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.products.remove(&product_id.as_i64()).is_some())
    }

    async fn set_shelf_status(&self, product_id: ProductId, on_shelf: bool) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.products.get_mut(&product_id.as_i64()) {
            Some(product) => {
                product.on_shelf = on_shelf;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn page_by_merchant(
        &self,
        merchant_id: MerchantId,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let inner = self.inner.read().await;
        let matches: Vec<Product> = inner
            .products
            .values()
            .filter(|p| p.merchant_id == merchant_id)
            .cloned()
            .collect();
        Ok(paginate(&matches, page))
    }

    async fn page_by_name(&self, name: &str, page: PageRequest) -> Result<Page<Product>> {
        let inner = self.inner.read().await;
        let matches: Vec<Product> = inner
            .products
            .values()
            .filter(|p| p.product_name.contains(name))
            .cloned()
            .collect();
        Ok(paginate(&matches, page))
    }

    async fn decrement_stock(&self, product_id: ProductId, quantity: u32) -> Result<i64> {
        let mut inner = self.inner.write().await;

        let observed = inner
            .products
            .get(&product_id.as_i64())
            .map(|p| p.stock)
            .ok_or(StorageError::ProductNotFound(product_id))?;

        if observed < i64::from(quantity) {
            return Err(StorageError::InsufficientStock {
                product_id,
                requested: quantity,
                available: observed,
            });
        }

        if inner.conflict_next_decrement {
            inner.conflict_next_decrement = false;
            return Err(StorageError::StockConflict(product_id));
        }

        let updated = observed - i64::from(quantity);
        if let Some(product) = inner.products.get_mut(&product_id.as_i64()) {
            product.stock = updated;
        }
        Ok(updated)
    }

    async fn increment_stock(&self, product_id: ProductId, quantity: u32) -> Result<i64> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(&product_id.as_i64())
            .ok_or(StorageError::ProductNotFound(product_id))?;
        product.stock += i64::from(quantity);
        Ok(product.stock)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn get_order(&self, order_no: &OrderNo) -> Result<Option<OrderHeader>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .iter()
            .find(|o| &o.order_no == order_no)
            .cloned())
    }

    async fn insert_order(
        &self,
        order_no: &OrderNo,
        user_id: UserId,
        items: &[NewOrderLineItem],
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner.fail_next_order_insert {
            inner.fail_next_order_insert = false;
            return Err(StorageError::Database(sqlx::Error::PoolClosed));
        }

        if inner.orders.iter().any(|o| &o.order_no == order_no) {
            return Err(StorageError::DuplicateOrderNo(order_no.clone()));
        }

        // Header and items land together or not at all; nothing below
        // this point can fail.
        inner.orders.push(OrderHeader {
            order_no: order_no.clone(),
            user_id,
            created_at: Utc::now(),
        });
        for item in items {
            inner.next_item_id += 1;
            let id = inner.next_item_id;
            inner.order_items.push(OrderLineItem {
                id,
                order_no: order_no.clone(),
                product_id: item.product_id,
                quantity: item.quantity,
                merchant_id: item.merchant_id,
            });
        }
        Ok(())
    }

    async fn items_for_order(&self, order_no: &OrderNo) -> Result<Vec<OrderLineItem>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order_items
            .iter()
            .filter(|i| &i.order_no == order_no)
            .cloned()
            .collect())
    }

    async fn page_items_by_merchant(
        &self,
        merchant_id: MerchantId,
        page: PageRequest,
    ) -> Result<Page<OrderLineItem>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<OrderLineItem> = inner
            .order_items
            .iter()
            .filter(|i| i.merchant_id == merchant_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(paginate(&matches, page))
    }

    async fn page_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<OrderHeader>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<OrderHeader> = inner
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_no.as_str().cmp(a.order_no.as_str()))
        });
        Ok(paginate(&matches, page))
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<OrderHeader>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<OrderHeader> = inner
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_no.as_str().cmp(a.order_no.as_str()))
        });
        Ok(matches)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn upsert_entry(&self, entry: CartEntry) -> Result<()> {
        let mut inner = self.inner.write().await;
        let key = (entry.user_id.as_i64(), entry.product_id.as_i64());
        *inner.carts.entry(key).or_insert(0) += entry.quantity;
        Ok(())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .carts
            .iter()
            .filter(|((uid, _), _)| *uid == user_id.as_i64())
            .map(|((uid, pid), qty)| CartEntry {
                user_id: UserId::new(*uid),
                product_id: ProductId::new(*pid),
                quantity: *qty,
            })
            .collect())
    }

    async fn page_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<CartEntry>> {
        let all = CartStore::list_by_user(self, user_id).await?;
        Ok(paginate(&all, page))
    }

    async fn remove_entry(&self, user_id: UserId, product_id: ProductId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .carts
            .remove(&(user_id.as_i64(), product_id.as_i64()))
            .is_some())
    }

    async fn clear(&self, user_id: UserId) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.carts.len();
        inner.carts.retain(|(uid, _), _| *uid != user_id.as_i64());
        Ok((before - inner.carts.len()) as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id.as_i64()).cloned())
    }

    async fn get_user_by_account(&self, account: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.account == account).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserId> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.account == user.account) {
            return Err(StorageError::DuplicateAccount(user.account));
        }
        inner.next_user_id += 1;
        let id = inner.next_user_id;
        inner.users.insert(
            id,
            User {
                user_id: UserId::new(id),
                account: user.account,
                username: user.username,
                password: user.password,
            },
        );
        Ok(UserId::new(id))
    }
}

#[async_trait]
impl MerchantStore for MemoryStore {
    async fn get_merchant(&self, merchant_id: MerchantId) -> Result<Option<Merchant>> {
        let inner = self.inner.read().await;
        Ok(inner.merchants.get(&merchant_id.as_i64()).cloned())
    }

    async fn get_merchant_by_account(&self, account: &str) -> Result<Option<Merchant>> {
        let inner = self.inner.read().await;
        Ok(inner
            .merchants
            .values()
            .find(|m| m.account == account)
            .cloned())
    }

    async fn insert_merchant(&self, merchant: NewMerchant) -> Result<MerchantId> {
        let mut inner = self.inner.write().await;
        if inner.merchants.values().any(|m| m.account == merchant.account) {
            return Err(StorageError::DuplicateAccount(merchant.account));
        }
        inner.next_merchant_id += 1;
        let id = inner.next_merchant_id;
        inner.merchants.insert(
            id,
            Merchant {
                merchant_id: MerchantId::new(id),
                merchant_name: merchant.merchant_name,
                account: merchant.account,
                password: merchant.password,
            },
        );
        Ok(MerchantId::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    fn widget(stock: i64) -> NewProduct {
        NewProduct {
            product_name: "Widget".to_string(),
            product_desc: "A widget".to_string(),
            stock,
            product_pic: String::new(),
            price: Money::from_cents(1000),
            on_shelf: true,
            merchant_id: MerchantId::new(10),
        }
    }

    #[tokio::test]
    async fn product_crud_roundtrip() {
        let store = MemoryStore::new();
        let id = store.insert_product(widget(5)).await.unwrap();

        let mut product = store.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.stock, 5);

        product.price = Money::from_cents(1500);
        assert!(store.update_product(&product).await.unwrap());
        assert!(store.set_shelf_status(id, false).await.unwrap());

        let reloaded = store.get_product(id).await.unwrap().unwrap();
        assert_eq!(reloaded.price.cents(), 1500);
        assert!(!reloaded.on_shelf);

        assert!(store.delete_product(id).await.unwrap());
        assert!(store.get_product(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn decrement_succeeds_with_sufficient_stock() {
        let store = MemoryStore::new();
        let id = store.insert_product(widget(5)).await.unwrap();

        let remaining = store.decrement_stock(id, 3).await.unwrap();
        assert_eq!(remaining, 2);
        assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn decrement_rejects_insufficient_stock() {
        let store = MemoryStore::new();
        let id = store.insert_product(widget(2)).await.unwrap();

        let err = store.decrement_stock(id, 3).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        // Stock untouched on rejection.
        assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn decrement_rejects_missing_product() {
        let store = MemoryStore::new();
        let err = store
            .decrement_stock(ProductId::new(999), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn decrement_conflict_hook_fires_once() {
        let store = MemoryStore::new();
        let id = store.insert_product(widget(5)).await.unwrap();

        store.set_conflict_on_next_decrement().await;
        let err = store.decrement_stock(id, 1).await.unwrap_err();
        assert!(matches!(err, StorageError::StockConflict(_)));
        assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 5);

        // The hook is consumed; the retry succeeds.
        assert_eq!(store.decrement_stock(id, 1).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn increment_restores_stock() {
        let store = MemoryStore::new();
        let id = store.insert_product(widget(5)).await.unwrap();
        store.decrement_stock(id, 4).await.unwrap();
        assert_eq!(store.increment_stock(id, 4).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn order_insert_is_all_or_nothing() {
        let store = MemoryStore::new();
        let no = OrderNo::new("202501010000000001234");
        let items = vec![NewOrderLineItem {
            product_id: ProductId::new(1),
            quantity: 2,
            merchant_id: MerchantId::new(10),
        }];

        store.insert_order(&no, UserId::new(1), &items).await.unwrap();
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.items_for_order(&no).await.unwrap().len(), 1);

        // Same order number again: rejected, nothing extra written.
        let err = store
            .insert_order(&no, UserId::new(1), &items)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateOrderNo(_)));
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.order_item_count().await, 1);
    }

    #[tokio::test]
    async fn order_pages_newest_first() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        for i in 0..6 {
            let no = OrderNo::new(format!("NO-{i:04}"));
            store.insert_order(&no, user, &[]).await.unwrap();
        }

        let page = OrderStore::page_by_user(&store, user, PageRequest::new(Some(1), Some(4)))
            .await
            .unwrap();
        assert_eq!(page.total, 6);
        assert_eq!(page.pages, 2);
        assert_eq!(page.items.len(), 4);

        let page2 = OrderStore::page_by_user(&store, user, PageRequest::new(Some(2), Some(4)))
            .await
            .unwrap();
        assert_eq!(page2.items.len(), 2);

        // A page number far past the data yields an empty page, not a
        // panic or a wrapped offset.
        let far = OrderStore::page_by_user(&store, user, PageRequest::new(Some(u32::MAX), Some(4)))
            .await
            .unwrap();
        assert_eq!(far.total, 6);
        assert!(far.items.is_empty());
    }

    #[tokio::test]
    async fn merchant_item_page_filters_and_orders_newest_first() {
        let store = MemoryStore::new();
        let mine = MerchantId::new(10);
        let other = MerchantId::new(11);

        for i in 0..5 {
            let no = OrderNo::new(format!("NO-{i:04}"));
            store
                .insert_order(
                    &no,
                    UserId::new(1),
                    &[
                        NewOrderLineItem {
                            product_id: ProductId::new(1),
                            quantity: 1,
                            merchant_id: mine,
                        },
                        NewOrderLineItem {
                            product_id: ProductId::new(2),
                            quantity: 1,
                            merchant_id: other,
                        },
                    ],
                )
                .await
                .unwrap();
        }

        let page = store
            .page_items_by_merchant(mine, PageRequest::new(Some(1), Some(3)))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 2);
        assert_eq!(page.items.len(), 3);
        assert!(page.items.iter().all(|i| i.merchant_id == mine));
        // Most recently written line first.
        assert!(page.items[0].id > page.items[1].id);

        let page2 = store
            .page_items_by_merchant(mine, PageRequest::new(Some(2), Some(3)))
            .await
            .unwrap();
        assert_eq!(page2.items.len(), 2);
    }

    #[tokio::test]
    async fn cart_upsert_is_additive() {
        let store = MemoryStore::new();
        let entry = CartEntry {
            user_id: UserId::new(1),
            product_id: ProductId::new(7),
            quantity: 2,
        };
        store.upsert_entry(entry.clone()).await.unwrap();
        store.upsert_entry(entry).await.unwrap();

        let entries = CartStore::list_by_user(&store, UserId::new(1)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity, 4);

        assert!(store
            .remove_entry(UserId::new(1), ProductId::new(7))
            .await
            .unwrap());
        assert_eq!(store.clear(UserId::new(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_accounts_rejected() {
        let store = MemoryStore::new();
        let user = NewUser {
            account: "alice".to_string(),
            username: "Alice".to_string(),
            password: "pw".to_string(),
        };
        store.insert_user(user.clone()).await.unwrap();
        let err = store.insert_user(user).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateAccount(_)));

        let merchant = NewMerchant {
            merchant_name: "Shop".to_string(),
            account: "shop".to_string(),
            password: "pw".to_string(),
        };
        store.insert_merchant(merchant.clone()).await.unwrap();
        let err = store.insert_merchant(merchant).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateAccount(_)));
    }
}
