use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, CategoryId, OrderId, ProductId, UserId};
use domain::{
    Address, Cart, CartItem, Category, CategoryTree, Money, NewCategory, NewProduct, Order,
    OrderItem, OrderParts, OrderStatus, Product, ProductChanges,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::query::{Page, PageRequest, ProductQuery};
use crate::store::{CartStore, CatalogStore, OrderStore, ProductRow};
use crate::{Result, StoreError};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price, p.stock_quantity, p.sku, \
     p.category_id, p.active, p.created_at, p.updated_at, c.name AS category_name";

const CATEGORY_COLUMNS: &str =
    "id, name, description, slug, parent_id, active, sort_order, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, shipping_amount, \
     shipping_address, billing_address, payment_method, payment_status, payment_transaction_id, \
     order_date, shipped_date, delivered_date, tracking_number, notes, created_at, updated_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_category(row: PgRow) -> Result<Category> {
        Ok(Category {
            id: CategoryId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            slug: row.try_get("slug")?,
            parent_id: row
                .try_get::<Option<i64>, _>("parent_id")?
                .map(CategoryId::new),
            active: row.try_get("active")?,
            sort_order: row.try_get("sort_order")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<ProductRow> {
        Ok(ProductRow {
            product: Product {
                id: ProductId::new(row.try_get("id")?),
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                price: Money::new(row.try_get::<Decimal, _>("price")?),
                stock_quantity: row.try_get("stock_quantity")?,
                sku: row.try_get("sku")?,
                category_id: CategoryId::new(row.try_get("category_id")?),
                active: row.try_get("active")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            },
            category_name: row.try_get("category_name")?,
        })
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let payment_method = row
            .try_get::<Option<String>, _>("payment_method")?
            .map(|m| m.parse())
            .transpose()?;

        Ok(Order::restore(OrderParts {
            id: OrderId::new(row.try_get("id")?),
            order_number: row.try_get("order_number")?,
            user_id: UserId::new(row.try_get("user_id")?),
            status: row.try_get::<String, _>("status")?.parse()?,
            items,
            shipping_amount: Money::new(row.try_get::<Decimal, _>("shipping_amount")?),
            shipping_address: address_from_json(row.try_get("shipping_address")?)?,
            billing_address: address_from_json(row.try_get("billing_address")?)?,
            payment_method,
            payment_status: row.try_get::<String, _>("payment_status")?.parse()?,
            payment_transaction_id: row.try_get("payment_transaction_id")?,
            order_date: row.try_get("order_date")?,
            shipped_date: row.try_get("shipped_date")?,
            delivered_date: row.try_get("delivered_date")?,
            tracking_number: row.try_get("tracking_number")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    async fn fetch_product(conn: &mut PgConnection, id: ProductId) -> Result<ProductRow> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON c.id = p.category_id WHERE p.id = $1"
        ))
        .bind(id.as_i64())
        .fetch_one(&mut *conn)
        .await?;

        Self::row_to_product(row)
    }

    async fn fetch_category_links(
        conn: &mut PgConnection,
    ) -> Result<Vec<(CategoryId, Option<CategoryId>)>> {
        let rows: Vec<(i64, Option<i64>)> = sqlx::query_as("SELECT id, parent_id FROM categories")
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, parent)| (CategoryId::new(id), parent.map(CategoryId::new)))
            .collect())
    }

    /// Writes the cart header and rewrites its items in order.
    ///
    /// Must run inside a transaction: the header row stays locked until
    /// commit, and the write is refused unless the stored version still
    /// matches `cart.version()`. Returns the cart id and its new version.
    async fn write_cart(conn: &mut PgConnection, cart: &Cart) -> Result<(CartId, i64)> {
        let user_id = cart.user_id().as_i64();
        let current: Option<(i64, i64)> =
            sqlx::query_as("SELECT id, version FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *conn)
                .await?;

        let actual = current.map_or(0, |(_, version)| version);
        if actual != cart.version() {
            return Err(StoreError::stale_cart(cart, actual));
        }
        let version = actual + 1;

        let cart_id = match current {
            Some((cart_id, _)) => {
                sqlx::query("UPDATE carts SET version = $2, updated_at = $3 WHERE id = $1")
                    .bind(cart_id)
                    .bind(version)
                    .bind(cart.updated_at())
                    .execute(&mut *conn)
                    .await?;
                cart_id
            }
            None => sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO carts (user_id, version, created_at, updated_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(user_id)
            .bind(version)
            .bind(cart.created_at())
            .bind(cart.updated_at())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                // Another transaction created the user's cart first
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_cart_user")
                {
                    return StoreError::stale_cart(cart, 1);
                }
                StoreError::Database(e)
            })?,
        };

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *conn)
            .await?;

        for (position, item) in cart.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (cart_id, position, product_id, product_name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(cart_id)
            .bind(position_to_i32(position)?)
            .bind(item.product_id.as_i64())
            .bind(&item.product_name)
            .bind(item.unit_price.amount())
            .bind(quantity_to_i32(item.quantity)?)
            .execute(&mut *conn)
            .await?;
        }

        Ok((CartId::new(cart_id), version))
    }

    async fn order_items(&self, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, unit_price, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id: i64 = row.try_get("order_id")?;
            items.entry(order_id).or_default().push(OrderItem::new(
                ProductId::new(row.try_get("product_id")?),
                row.try_get::<String, _>("product_name")?,
                quantity_from_i32(row.try_get("quantity")?)?,
                Money::new(row.try_get::<Decimal, _>("unit_price")?),
            ));
        }
        Ok(items)
    }
}

/// Builds the `FROM ... WHERE ...` part of a listing query.
///
/// Returns the clause and the values to bind, in placeholder order.
fn product_filter(query: &ProductQuery) -> (String, Vec<String>) {
    let mut sql = String::from(
        " FROM products p JOIN categories c ON c.id = p.category_id WHERE p.active",
    );
    let mut binds = Vec::new();
    let mut param_count = 0;

    if let Some(category) = query.category() {
        param_count += 1;
        sql.push_str(&format!(" AND strpos(lower(c.name), ${param_count}) > 0"));
        binds.push(category.to_string());
    }
    if let Some(search) = query.search() {
        param_count += 1;
        sql.push_str(&format!(
            " AND (strpos(lower(p.name), ${param_count}) > 0 \
             OR strpos(lower(coalesce(p.description, '')), ${param_count}) > 0 \
             OR strpos(lower(p.sku), ${param_count}) > 0)"
        ));
        binds.push(search.to_string());
    }

    (sql, binds)
}

fn address_from_json(value: Option<serde_json::Value>) -> Result<Option<Address>> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(StoreError::from)
}

fn address_to_json(address: Option<&Address>) -> Result<Option<serde_json::Value>> {
    address
        .map(serde_json::to_value)
        .transpose()
        .map_err(StoreError::from)
}

fn quantity_to_i32(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::CorruptRow(format!("quantity {quantity} is out of range")))
}

fn quantity_from_i32(quantity: i32) -> Result<u32> {
    u32::try_from(quantity)
        .map_err(|_| StoreError::CorruptRow(format!("negative quantity {quantity}")))
}

fn position_to_i32(position: usize) -> Result<i32> {
    i32::try_from(position)
        .map_err(|_| StoreError::CorruptRow(format!("item position {position} is out of range")))
}

/// Maps a foreign-key violation on `category_id` to a missing category.
fn category_fk_error(err: sqlx::Error, category_id: CategoryId) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_foreign_key_violation()
    {
        return StoreError::NotFound {
            entity: "Category",
            id: category_id.as_i64(),
        };
    }
    StoreError::Database(err)
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn insert_category(&self, category: &NewCategory) -> Result<Category> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO categories (name, description, slug, parent_id, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(category.name.trim())
        .bind(&category.description)
        .bind(category.resolved_slug())
        .bind(category.parent_id.map(|id| id.as_i64()))
        .bind(category.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match category.parent_id {
            Some(parent_id) => category_fk_error(e, parent_id),
            None => StoreError::Database(e),
        })?;

        Self::row_to_category(row)
    }

    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_category).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE active ORDER BY sort_order ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_category).collect()
    }

    async fn category_links(&self) -> Result<Vec<(CategoryId, Option<CategoryId>)>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_category_links(&mut conn).await
    }

    async fn category_name_exists(&self, name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE active AND lower(name) = lower($1))",
        )
        .bind(name.trim())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn category_slug_exists(&self, slug: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn set_category_parent(
        &self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> Result<Category> {
        let mut tx = self.pool.begin().await?;

        // Blocks other moves until commit so the cycle check sees final links
        sqlx::query("LOCK TABLE categories IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let tree = CategoryTree::from_links(Self::fetch_category_links(&mut tx).await?);
        if let Some(missing) = std::iter::once(id)
            .chain(parent_id)
            .find(|&category_id| !tree.contains(category_id))
        {
            return Err(StoreError::NotFound {
                entity: "Category",
                id: missing.as_i64(),
            });
        }
        tree.check_parent(id, parent_id)?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE categories SET parent_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(parent_id.map(|p| p.as_i64()))
        .fetch_one(&mut *tx)
        .await?;

        let category = Self::row_to_category(row)?;
        tx.commit().await?;
        Ok(category)
    }

    async fn count_active_products(&self, category_id: CategoryId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE active AND category_id = $1",
        )
        .bind(category_id.as_i64())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<ProductRow> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (name, description, price, stock_quantity, sku, category_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.stock_quantity)
        .bind(&product.sku)
        .bind(product.category_id.as_i64())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| category_fk_error(e, product.category_id))?;

        let row = Self::fetch_product(&mut tx, ProductId::new(id)).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn find_active_product(&self, id: ProductId) -> Result<Option<ProductRow>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON c.id = p.category_id WHERE p.id = $1 AND p.active"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<ProductRow> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so concurrent updates apply one after the other
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON c.id = p.category_id \
             WHERE p.id = $1 AND p.active FOR UPDATE OF p"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "Product",
            id: id.as_i64(),
        })?;

        let mut product = Self::row_to_product(row)?.product;
        product.apply_changes(changes, Utc::now());

        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, stock_quantity = $5,
                sku = $6, category_id = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.stock_quantity)
        .bind(&product.sku)
        .bind(product.category_id.as_i64())
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| category_fk_error(e, product.category_id))?;

        let updated = Self::fetch_product(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn soft_delete_product(&self, id: ProductId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE id = $1 AND active FOR UPDATE")
                .bind(id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;

        if locked.is_none() {
            return Err(StoreError::NotFound {
                entity: "Product",
                id: id.as_i64(),
            });
        }

        sqlx::query("UPDATE products SET active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn sku_exists(&self, sku: &str, excluding: Option<ProductId>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM products
                WHERE active AND sku = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(sku)
        .bind(excluding.map(|id| id.as_i64()))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn query_products(
        &self,
        query: &ProductQuery,
        page: &PageRequest,
    ) -> Result<Page<ProductRow>> {
        let (filter, binds) = product_filter(query);

        let count_sql = format!("SELECT COUNT(*){filter}");
        let mut count_query = sqlx::query_scalar(&count_sql);
        for value in &binds {
            count_query = count_query.bind(value);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?;

        let param_count = binds.len();
        let select_sql = format!(
            "SELECT {PRODUCT_COLUMNS}{filter} {} LIMIT ${} OFFSET ${}",
            page.sort().order_by_clause(),
            param_count + 1,
            param_count + 2
        );
        let mut select_query = sqlx::query(&select_sql);
        for value in &binds {
            select_query = select_query.bind(value);
        }
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let rows = select_query
            .bind(i64::from(page.size()))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let content = rows
            .into_iter()
            .map(Self::row_to_product)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(content, page, total.max(0) as u64))
    }

    async fn low_stock_products(&self, threshold: i32) -> Result<Vec<ProductRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON c.id = p.category_id \
             WHERE p.active AND p.stock_quantity <= $1 \
             ORDER BY p.stock_quantity ASC, p.id ASC"
        ))
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn load_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let header: Option<(i64, i64, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, version, created_at, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some((cart_id, version, created_at, updated_at)) = header else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"
            SELECT product_id, product_name, unit_price, quantity
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| -> Result<CartItem> {
                Ok(CartItem::new(
                    ProductId::new(row.try_get("product_id")?),
                    row.try_get::<String, _>("product_name")?,
                    Money::new(row.try_get::<Decimal, _>("unit_price")?),
                    quantity_from_i32(row.try_get("quantity")?)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Cart::restore(
            CartId::new(cart_id),
            user_id,
            items,
            version,
            created_at,
            updated_at,
        )))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        let (cart_id, version) = Self::write_cart(&mut tx, cart).await?;
        tx.commit().await?;

        let mut saved = cart.clone();
        saved.mark_stored(cart_id, version);
        Ok(saved)
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn place_order(&self, order: &Order, emptied_cart: &Cart) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // The cart goes first so a concurrent checkout waits on its lock
        Self::write_cart(&mut tx, emptied_cart).await?;

        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                order_number, user_id, status, subtotal, tax_amount, shipping_amount, total_amount,
                shipping_address, billing_address, payment_method, payment_status,
                payment_transaction_id, order_date, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING id
            "#,
        )
        .bind(order.order_number())
        .bind(order.user_id().as_i64())
        .bind(order.status().as_str())
        .bind(order.subtotal().amount())
        .bind(order.tax_amount().amount())
        .bind(order.shipping_amount().amount())
        .bind(order.total_amount().amount())
        .bind(address_to_json(order.shipping_address())?)
        .bind(address_to_json(order.billing_address())?)
        .bind(order.payment_method().map(|m| m.as_str()))
        .bind(order.payment_status().as_str())
        .bind(order.payment_transaction_id())
        .bind(order.order_date())
        .bind(order.notes())
        .bind(order.created_at())
        .bind(order.updated_at())
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order_id)
            .bind(position_to_i32(position)?)
            .bind(item.product_id.as_i64())
            .bind(&item.product_name)
            .bind(item.unit_price.amount())
            .bind(quantity_to_i32(item.quantity)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let mut stored = order.clone();
        stored.assign_id(OrderId::new(order_id));
        Ok(stored)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut items = self.order_items(&[id.as_i64()]).await?;
        let order = Self::row_to_order(&row, items.remove(&id.as_i64()).unwrap_or_default())?;
        Ok(Some(order))
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY order_date DESC, id DESC"
        ))
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = self.order_items(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_order(row, items.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn update_order_status(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        let id = order.id().ok_or_else(|| {
            StoreError::CorruptRow("cannot update an order that was never stored".to_string())
        })?;

        let mut tx = self.pool.begin().await?;

        let actual: OrderStatus =
            sqlx::query_scalar::<_, String>("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id.as_i64())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::NotFound {
                    entity: "Order",
                    id: id.as_i64(),
                })?
                .parse()?;
        if actual != expected {
            return Err(StoreError::stale_order(id, expected, actual));
        }

        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, payment_status = $3, shipped_date = $4, delivered_date = $5,
                tracking_number = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.shipped_date())
        .bind(order.delivered_date())
        .bind(order.tracking_number())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
