use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, CategoryId, OrderId, ProductId, UserId};
use domain::{
    Cart, Category, CategoryTree, NewCategory, NewProduct, Order, OrderStatus, Product,
    ProductChanges,
};
use tokio::sync::RwLock;

use crate::query::{Page, PageRequest, ProductQuery};
use crate::store::{CartStore, CatalogStore, OrderStore, ProductRow};
use crate::{Result, StoreError};

#[derive(Default)]
struct State {
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    carts: BTreeMap<UserId, Cart>,
    orders: BTreeMap<OrderId, Order>,
    last_category_id: i64,
    last_product_id: i64,
    last_cart_id: i64,
    last_order_id: i64,
}

impl State {
    fn row(&self, product: &Product) -> Result<ProductRow> {
        let category = self.categories.get(&product.category_id).ok_or_else(|| {
            StoreError::CorruptRow(format!(
                "product {} references missing category {}",
                product.id, product.category_id
            ))
        })?;
        Ok(ProductRow {
            product: product.clone(),
            category_name: category.name.clone(),
        })
    }

    fn category_name(&self, id: CategoryId) -> &str {
        self.categories
            .get(&id)
            .map(|c| c.name.as_str())
            .unwrap_or_default()
    }

    fn active_product_mut(&mut self, id: ProductId) -> Result<&mut Product> {
        self.products
            .get_mut(&id)
            .filter(|p| p.active)
            .ok_or(StoreError::NotFound {
                entity: "Product",
                id: id.as_i64(),
            })
    }

    /// Version-checked cart write shared by `save_cart` and `place_order`.
    fn store_cart(&mut self, cart: &Cart) -> Result<Cart> {
        let current = self.carts.get(&cart.user_id());
        let actual = current.map_or(0, Cart::version);
        if actual != cart.version() {
            return Err(StoreError::stale_cart(cart, actual));
        }

        let id = match current.and_then(Cart::id) {
            Some(id) => id,
            None => {
                self.last_cart_id += 1;
                CartId::new(self.last_cart_id)
            }
        };
        let mut stored = cart.clone();
        stored.mark_stored(id, actual + 1);
        self.carts.insert(stored.user_id(), stored.clone());
        Ok(stored)
    }
}

/// In-memory store implementation for tests and database-less runs.
///
/// This implementation keeps every table in memory and provides
/// the same interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    product_reads: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of single-product lookups served so far.
    pub fn product_reads(&self) -> usize {
        self.product_reads.load(Ordering::SeqCst)
    }

    /// Returns the number of stored products, active or not.
    pub async fn product_count(&self) -> usize {
        self.state.read().await.products.len()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_category(&self, category: &NewCategory) -> Result<Category> {
        let mut state = self.state.write().await;

        if let Some(parent_id) = category.parent_id
            && !state.categories.contains_key(&parent_id)
        {
            return Err(StoreError::NotFound {
                entity: "Category",
                id: parent_id.as_i64(),
            });
        }

        state.last_category_id += 1;
        let now = Utc::now();
        let stored = Category {
            id: CategoryId::new(state.last_category_id),
            name: category.name.trim().to_string(),
            description: category.description.clone(),
            slug: category.resolved_slug(),
            parent_id: category.parent_id,
            active: true,
            sort_order: category.sort_order,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<_> = state
            .categories
            .values()
            .filter(|c| c.active)
            .cloned()
            .collect();
        categories.sort_by_key(|c| (c.sort_order, c.id));
        Ok(categories)
    }

    async fn category_links(&self) -> Result<Vec<(CategoryId, Option<CategoryId>)>> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .map(|c| (c.id, c.parent_id))
            .collect())
    }

    async fn category_name_exists(&self, name: &str) -> Result<bool> {
        let name = name.trim().to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .any(|c| c.active && c.name.to_lowercase() == name))
    }

    async fn category_slug_exists(&self, slug: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.categories.values().any(|c| c.slug == slug))
    }

    async fn set_category_parent(
        &self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> Result<Category> {
        let mut state = self.state.write().await;

        let tree = CategoryTree::from_categories(state.categories.values());
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

        let category = state
            .categories
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "Category",
                id: id.as_i64(),
            })?;
        category.parent_id = parent_id;
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    async fn count_active_products(&self, category_id: CategoryId) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .filter(|p| p.active && p.category_id == category_id)
            .count() as u64)
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<ProductRow> {
        let mut state = self.state.write().await;

        if !state.categories.contains_key(&product.category_id) {
            return Err(StoreError::NotFound {
                entity: "Category",
                id: product.category_id.as_i64(),
            });
        }

        state.last_product_id += 1;
        let now = Utc::now();
        let stored = Product {
            id: ProductId::new(state.last_product_id),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            stock_quantity: product.stock_quantity,
            sku: product.sku.clone(),
            category_id: product.category_id,
            active: true,
            created_at: now,
            updated_at: now,
        };
        let row = state.row(&stored)?;
        state.products.insert(stored.id, stored);
        Ok(row)
    }

    async fn find_active_product(&self, id: ProductId) -> Result<Option<ProductRow>> {
        self.product_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        state
            .products
            .get(&id)
            .filter(|p| p.active)
            .map(|p| state.row(p))
            .transpose()
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<ProductRow> {
        let mut state = self.state.write().await;

        if let Some(category_id) = changes.category_id
            && !state.categories.contains_key(&category_id)
        {
            return Err(StoreError::NotFound {
                entity: "Category",
                id: category_id.as_i64(),
            });
        }

        let product = state.active_product_mut(id)?;
        product.apply_changes(changes, Utc::now());
        let updated = product.clone();
        state.row(&updated)
    }

    async fn soft_delete_product(&self, id: ProductId) -> Result<()> {
        let mut state = self.state.write().await;
        let product = state.active_product_mut(id)?;
        product.active = false;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn sku_exists(&self, sku: &str, excluding: Option<ProductId>) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .any(|p| p.active && p.sku == sku && Some(p.id) != excluding))
    }

    async fn query_products(
        &self,
        query: &ProductQuery,
        page: &PageRequest,
    ) -> Result<Page<ProductRow>> {
        let state = self.state.read().await;

        let mut matches: Vec<&Product> = state
            .products
            .values()
            .filter(|p| query.matches(p, state.category_name(p.category_id)))
            .collect();
        let sort = page.sort();
        matches.sort_by(|a, b| sort.compare(a, b));

        let total = matches.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let content = matches
            .into_iter()
            .skip(offset)
            .take(page.size() as usize)
            .map(|p| state.row(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(content, page, total))
    }

    async fn low_stock_products(&self, threshold: i32) -> Result<Vec<ProductRow>> {
        let state = self.state.read().await;
        let mut products: Vec<&Product> = state
            .products
            .values()
            .filter(|p| p.active && p.stock_quantity <= threshold)
            .collect();
        products.sort_by_key(|p| (p.stock_quantity, p.id));
        products.into_iter().map(|p| state.row(p)).collect()
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn load_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.state.read().await.carts.get(&user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart> {
        self.state.write().await.store_cart(cart)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn place_order(&self, order: &Order, emptied_cart: &Cart) -> Result<Order> {
        let mut state = self.state.write().await;
        state.store_cart(emptied_cart)?;

        state.last_order_id += 1;
        let id = OrderId::new(state.last_order_id);
        let mut stored = order.clone();
        stored.assign_id(id);
        state.orders.insert(id, stored.clone());

        Ok(stored)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.order_date()
                .cmp(&a.order_date())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(orders)
    }

    async fn update_order_status(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        let id = order.id().ok_or_else(|| {
            StoreError::CorruptRow("cannot update an order that was never stored".to_string())
        })?;

        let mut state = self.state.write().await;
        let stored = state.orders.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "Order",
            id: id.as_i64(),
        })?;
        if stored.status() != expected {
            return Err(StoreError::stale_order(id, expected, stored.status()));
        }
        *stored = order.clone();
        Ok(())
    }
}
