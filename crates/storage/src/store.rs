//! Repository traits implemented by [`PgStore`](crate::PgStore) and
//! [`MemoryStore`](crate::MemoryStore).

use async_trait::async_trait;
use common::{MerchantId, OrderNo, ProductId, UserId};

use crate::error::Result;
use crate::page::{Page, PageRequest};
use crate::records::{
    CartEntry, Merchant, NewMerchant, NewOrderLineItem, NewProduct, NewUser, OrderHeader,
    OrderLineItem, Product, User,
};

/// Product catalog plus the stock ledger.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Looks up a product by id.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Inserts a product and returns its assigned id.
    async fn insert_product(&self, product: NewProduct) -> Result<ProductId>;

    /// Updates name, description, price, picture, stock, and shelf
    /// status of an existing product. Returns false if no row matched.
    async fn update_product(&self, product: &Product) -> Result<bool>;

    /// Deletes a product. Returns false if no row matched.
    async fn delete_product(&self, product_id: ProductId) -> Result<bool>;

    /// Puts a product on or off the shelf. Returns false if no row matched.
    async fn set_shelf_status(&self, product_id: ProductId, on_shelf: bool) -> Result<bool>;

    /// Pages a merchant's products.
    async fn page_by_merchant(
        &self,
        merchant_id: MerchantId,
        page: PageRequest,
    ) -> Result<Page<Product>>;

    /// Pages products whose name contains the query string.
    async fn page_by_name(&self, name: &str, page: PageRequest) -> Result<Page<Product>>;

    /// Atomically decrements stock by `quantity`, returning the new
    /// stock value.
    ///
    /// Read-then-conditional-write: the decrement only commits if the
    /// stored stock still equals the value observed at read time.
    /// Fails with `ProductNotFound`, `InsufficientStock`, or
    /// `StockConflict` (a concurrent writer won the race; no automatic
    /// retry here — that is the caller's decision).
    async fn decrement_stock(&self, product_id: ProductId, quantity: u32) -> Result<i64>;

    /// Adds `quantity` back to stock, returning the new stock value.
    ///
    /// Compensating write for a decrement this process applied; it is
    /// unconditional because nobody else subtracts what we are restoring.
    async fn increment_stock(&self, product_id: ProductId, quantity: u32) -> Result<i64>;
}

/// Order headers and their line items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Looks up an order header by number. Also serves as the collision
    /// probe for the order-number generator.
    async fn get_order(&self, order_no: &OrderNo) -> Result<Option<OrderHeader>>;

    /// Persists one order header plus its line items under a single
    /// transaction; on any failure nothing is written.
    /// Fails with `DuplicateOrderNo` if the number is already taken.
    async fn insert_order(
        &self,
        order_no: &OrderNo,
        user_id: UserId,
        items: &[NewOrderLineItem],
    ) -> Result<()>;

    /// Lists the line items of an order in insertion order.
    async fn items_for_order(&self, order_no: &OrderNo) -> Result<Vec<OrderLineItem>>;

    /// Pages the line items attributed to a merchant, newest first.
    /// The merchant's view of what they have sold, across all orders.
    async fn page_items_by_merchant(
        &self,
        merchant_id: MerchantId,
        page: PageRequest,
    ) -> Result<Page<OrderLineItem>>;

    /// Pages a user's orders, newest first.
    async fn page_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<OrderHeader>>;

    /// Lists all of a user's orders, newest first.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<OrderHeader>>;
}

/// Per-user shopping carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Adds a product to a cart; if the (user, product) pair already
    /// exists the quantities are added together.
    async fn upsert_entry(&self, entry: CartEntry) -> Result<()>;

    /// Lists a user's cart entries.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<CartEntry>>;

    /// Pages a user's cart entries.
    async fn page_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<CartEntry>>;

    /// Removes one product from a cart. Returns false if nothing matched.
    async fn remove_entry(&self, user_id: UserId, product_id: ProductId) -> Result<bool>;

    /// Empties a user's cart, returning the number of removed entries.
    async fn clear(&self, user_id: UserId) -> Result<u64>;
}

/// Shop customers.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up a user by id.
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// Looks up a user by account name.
    async fn get_user_by_account(&self, account: &str) -> Result<Option<User>>;

    /// Inserts a user and returns the assigned id.
    /// Fails with `DuplicateAccount` if the account name is taken.
    async fn insert_user(&self, user: NewUser) -> Result<UserId>;
}

/// Sellers.
#[async_trait]
pub trait MerchantStore: Send + Sync {
    /// Looks up a merchant by id.
    async fn get_merchant(&self, merchant_id: MerchantId) -> Result<Option<Merchant>>;

    /// Looks up a merchant by account name.
    async fn get_merchant_by_account(&self, account: &str) -> Result<Option<Merchant>>;

    /// Inserts a merchant and returns the assigned id.
    /// Fails with `DuplicateAccount` if the account name is taken.
    async fn insert_merchant(&self, merchant: NewMerchant) -> Result<MerchantId>;
}

/// Everything the HTTP layer needs from one storage backend.
pub trait Store: ProductStore + OrderStore + CartStore + UserStore + MerchantStore {}

impl<T> Store for T where T: ProductStore + OrderStore + CartStore + UserStore + MerchantStore {}
