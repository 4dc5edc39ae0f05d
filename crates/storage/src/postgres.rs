use async_trait::async_trait;
use common::{MerchantId, Money, OrderNo, ProductId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{Result, StorageError};
use crate::page::{Page, PageRequest};
use crate::records::{
    CartEntry, Merchant, NewMerchant, NewOrderLineItem, NewProduct, NewUser, OrderHeader,
    OrderLineItem, Product, User,
};
use crate::store::{CartStore, MerchantStore, OrderStore, ProductStore, UserStore};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            product_desc: row.try_get("product_desc")?,
            stock: row.try_get("stock")?,
            product_pic: row.try_get("product_pic")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            on_shelf: row.try_get("on_shelf")?,
            merchant_id: MerchantId::new(row.try_get("merchant_id")?),
        })
    }

    fn row_to_order(row: PgRow) -> Result<OrderHeader> {
        Ok(OrderHeader {
            order_no: OrderNo::new(row.try_get::<String, _>("order_no")?),
            user_id: UserId::new(row.try_get("user_id")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

const PRODUCT_COLUMNS: &str =
    "product_id, product_name, product_desc, stock, product_pic, price_cents, on_shelf, merchant_id";

#[async_trait]
impl ProductStore for PgStore {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1"
        ))
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn insert_product(&self, product: NewProduct) -> Result<ProductId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (product_name, product_desc, stock, product_pic, price_cents, on_shelf, merchant_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING product_id
            "#,
        )
        .bind(&product.product_name)
        .bind(&product.product_desc)
        .bind(product.stock)
        .bind(&product.product_pic)
        .bind(product.price.cents())
        .bind(product.on_shelf)
        .bind(product.merchant_id.as_i64())
        .fetch_one(&self.pool)
        .await?;

        Ok(ProductId::new(id))
    }

    async fn update_product(&self, product: &Product) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET product_name = $1, product_desc = $2, stock = $3,
                product_pic = $4, price_cents = $5, on_shelf = $6
            WHERE product_id = $7
            "#,
        )
        .bind(&product.product_name)
        .bind(&product.product_desc)
        .bind(product.stock)
        .bind(&product.product_pic)
        .bind(product.price.cents())
        .bind(product.on_shelf)
        .bind(product.product_id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(product_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_shelf_status(&self, product_id: ProductId, on_shelf: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE products SET on_shelf = $1 WHERE product_id = $2")
            .bind(on_shelf)
            .bind(product_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn page_by_merchant(
        &self,
        merchant_id: MerchantId,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE merchant_id = $1")
            .bind(merchant_id.as_i64())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE merchant_id = $1 \
             ORDER BY product_id LIMIT $2 OFFSET $3"
        ))
        .bind(merchant_id.as_i64())
        .bind(i64::from(page.limit()))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_product)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(total as u64, page, items))
    }

    async fn page_by_name(&self, name: &str, page: PageRequest) -> Result<Page<Product>> {
        let pattern = format!("%{name}%");

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE product_name LIKE $1")
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_name LIKE $1 \
             ORDER BY product_id LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(i64::from(page.limit()))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_product)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(total as u64, page, items))
    }

    async fn decrement_stock(&self, product_id: ProductId, quantity: u32) -> Result<i64> {
        // Step 1: read the current value.
        let observed: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM products WHERE product_id = $1")
                .bind(product_id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

        let observed = observed.ok_or(StorageError::ProductNotFound(product_id))?;

        if observed < i64::from(quantity) {
            return Err(StorageError::InsufficientStock {
                product_id,
                requested: quantity,
                available: observed,
            });
        }

        let updated = observed - i64::from(quantity);

        // Step 2: conditional write. The `stock = $3` guard makes this a
        // compare-and-swap: if a concurrent decrement landed after our
        // read, zero rows match and we report the conflict instead of
        // double-spending the stock.
        let result =
            sqlx::query("UPDATE products SET stock = $1 WHERE product_id = $2 AND stock = $3")
                .bind(updated)
                .bind(product_id.as_i64())
                .bind(observed)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(%product_id, observed, "stock CAS lost, concurrent writer won");
            return Err(StorageError::StockConflict(product_id));
        }

        Ok(updated)
    }

    async fn increment_stock(&self, product_id: ProductId, quantity: u32) -> Result<i64> {
        let new_stock: Option<i64> = sqlx::query_scalar(
            "UPDATE products SET stock = stock + $1 WHERE product_id = $2 RETURNING stock",
        )
        .bind(i64::from(quantity))
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        new_stock.ok_or(StorageError::ProductNotFound(product_id))
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn get_order(&self, order_no: &OrderNo) -> Result<Option<OrderHeader>> {
        let row = sqlx::query("SELECT order_no, user_id, created_at FROM orders WHERE order_no = $1")
            .bind(order_no.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn insert_order(
        &self,
        order_no: &OrderNo,
        user_id: UserId,
        items: &[NewOrderLineItem],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO orders (order_no, user_id) VALUES ($1, $2)")
            .bind(order_no.as_str())
            .bind(user_id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("orders_pkey")
                {
                    return StorageError::DuplicateOrderNo(order_no.clone());
                }
                StorageError::Database(e)
            })?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_no, product_id, quantity, merchant_id)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order_no.as_str())
            .bind(item.product_id.as_i64())
            .bind(i64::from(item.quantity))
            .bind(item.merchant_id.as_i64())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn items_for_order(&self, order_no: &OrderNo) -> Result<Vec<OrderLineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_no, product_id, quantity, merchant_id
            FROM order_items
            WHERE order_no = $1
            ORDER BY id
            "#,
        )
        .bind(order_no.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order_item).collect()
    }

    async fn page_items_by_merchant(
        &self,
        merchant_id: MerchantId,
        page: PageRequest,
    ) -> Result<Page<OrderLineItem>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE merchant_id = $1")
            .bind(merchant_id.as_i64())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, order_no, product_id, quantity, merchant_id
            FROM order_items
            WHERE merchant_id = $1
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(merchant_id.as_i64())
        .bind(i64::from(page.limit()))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(row_to_order_item)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(total as u64, page, items))
    }

    async fn page_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<OrderHeader>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id.as_i64())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT order_no, user_id, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, order_no DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.as_i64())
        .bind(i64::from(page.limit()))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(total as u64, page, items))
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<OrderHeader>> {
        let rows = sqlx::query(
            r#"
            SELECT order_no, user_id, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, order_no DESC
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn upsert_entry(&self, entry: CartEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO carts (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = carts.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(entry.user_id.as_i64())
        .bind(entry.product_id.as_i64())
        .bind(i64::from(entry.quantity))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        let rows = sqlx::query(
            "SELECT user_id, product_id, quantity FROM carts WHERE user_id = $1 ORDER BY product_id",
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_cart_entry).collect()
    }

    async fn page_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<CartEntry>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carts WHERE user_id = $1")
            .bind(user_id.as_i64())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT user_id, product_id, quantity
            FROM carts
            WHERE user_id = $1
            ORDER BY product_id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.as_i64())
        .bind(i64::from(page.limit()))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(row_to_cart_entry)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(total as u64, page, items))
    }

    async fn remove_entry(&self, user_id: UserId, product_id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM carts WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.as_i64())
            .bind(product_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn row_to_order_item(row: PgRow) -> Result<OrderLineItem> {
    Ok(OrderLineItem {
        id: row.try_get("id")?,
        order_no: OrderNo::new(row.try_get::<String, _>("order_no")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: row.try_get::<i64, _>("quantity")? as u32,
        merchant_id: MerchantId::new(row.try_get("merchant_id")?),
    })
}

fn row_to_cart_entry(row: PgRow) -> Result<CartEntry> {
    Ok(CartEntry {
        user_id: UserId::new(row.try_get("user_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: row.try_get::<i64, _>("quantity")? as u32,
    })
}

#[async_trait]
impl UserStore for PgStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row =
            sqlx::query("SELECT user_id, account, username, password FROM users WHERE user_id = $1")
                .bind(user_id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_user).transpose()
    }

    async fn get_user_by_account(&self, account: &str) -> Result<Option<User>> {
        let row =
            sqlx::query("SELECT user_id, account, username, password FROM users WHERE account = $1")
                .bind(account)
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_user).transpose()
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (account, username, password) VALUES ($1, $2, $3) RETURNING user_id",
        )
        .bind(&user.account)
        .bind(&user.username)
        .bind(&user.password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_duplicate_account(e, &user.account, "users_account_key"))?;

        Ok(UserId::new(id))
    }
}

fn row_to_user(row: PgRow) -> Result<User> {
    Ok(User {
        user_id: UserId::new(row.try_get("user_id")?),
        account: row.try_get("account")?,
        username: row.try_get("username")?,
        password: row.try_get("password")?,
    })
}

#[async_trait]
impl MerchantStore for PgStore {
    async fn get_merchant(&self, merchant_id: MerchantId) -> Result<Option<Merchant>> {
        let row = sqlx::query(
            "SELECT merchant_id, merchant_name, account, password FROM merchants WHERE merchant_id = $1",
        )
        .bind(merchant_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_merchant).transpose()
    }

    async fn get_merchant_by_account(&self, account: &str) -> Result<Option<Merchant>> {
        let row = sqlx::query(
            "SELECT merchant_id, merchant_name, account, password FROM merchants WHERE account = $1",
        )
        .bind(account)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_merchant).transpose()
    }

    async fn insert_merchant(&self, merchant: NewMerchant) -> Result<MerchantId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO merchants (merchant_name, account, password)
            VALUES ($1, $2, $3)
            RETURNING merchant_id
            "#,
        )
        .bind(&merchant.merchant_name)
        .bind(&merchant.account)
        .bind(&merchant.password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_duplicate_account(e, &merchant.account, "merchants_account_key"))?;

        Ok(MerchantId::new(id))
    }
}

fn row_to_merchant(row: PgRow) -> Result<Merchant> {
    Ok(Merchant {
        merchant_id: MerchantId::new(row.try_get("merchant_id")?),
        merchant_name: row.try_get("merchant_name")?,
        account: row.try_get("account")?,
        password: row.try_get("password")?,
    })
}

fn map_duplicate_account(e: sqlx::Error, account: &str, constraint: &str) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some(constraint)
    {
        return StorageError::DuplicateAccount(account.to_string());
    }
    StorageError::Database(e)
}
