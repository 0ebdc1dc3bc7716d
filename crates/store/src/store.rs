use async_trait::async_trait;
use common::{CategoryId, OrderId, ProductId, UserId};
use domain::{
    Cart, Category, NewCategory, NewProduct, Order, OrderStatus, Product, ProductChanges,
};

use crate::Result;
use crate::query::{Page, PageRequest, ProductQuery};

/// A product joined with the name of its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub product: Product,
    pub category_name: String,
}

/// Persistence for categories and products.
///
/// Product lookups only ever see active rows: an inactive product behaves
/// exactly like a missing one, including for SKU uniqueness.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a category using its resolved slug.
    async fn insert_category(&self, category: &NewCategory) -> Result<Category>;

    /// Returns the category, active or not.
    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>>;

    /// Returns every active category ordered by `sort_order`, then id.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Returns the `(id, parent_id)` link of every category, active or not.
    async fn category_links(&self) -> Result<Vec<(CategoryId, Option<CategoryId>)>>;

    /// Checks whether an active category already uses `name`, ignoring case.
    async fn category_name_exists(&self, name: &str) -> Result<bool>;

    /// Checks whether any category already uses `slug`.
    async fn category_slug_exists(&self, slug: &str) -> Result<bool>;

    /// Moves a category under a new parent, or to the root when `None`.
    ///
    /// The cycle check runs against the links as they are at write time, so
    /// concurrent moves can never store a cycle. A parent inside the
    /// category's own subtree fails with `Rejected(CategoryCycle)`.
    async fn set_category_parent(
        &self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> Result<Category>;

    /// Counts the active products in a category.
    async fn count_active_products(&self, category_id: CategoryId) -> Result<u64>;

    /// Inserts an active product.
    async fn insert_product(&self, product: &NewProduct) -> Result<ProductRow>;

    /// Returns the product if it exists and is active.
    async fn find_active_product(&self, id: ProductId) -> Result<Option<ProductRow>>;

    /// Applies `changes` to an active product.
    ///
    /// Fails with `NotFound` if the product is missing or inactive.
    async fn update_product(&self, id: ProductId, changes: &ProductChanges)
    -> Result<ProductRow>;

    /// Clears the `active` flag of an active product.
    ///
    /// Fails with `NotFound` if the product is missing or already inactive.
    async fn soft_delete_product(&self, id: ProductId) -> Result<()>;

    /// Checks whether an active product other than `excluding` uses `sku`.
    async fn sku_exists(&self, sku: &str, excluding: Option<ProductId>) -> Result<bool>;

    /// Runs a listing query and returns the requested page.
    async fn query_products(
        &self,
        query: &ProductQuery,
        page: &PageRequest,
    ) -> Result<Page<ProductRow>>;

    /// Active products with `stock_quantity <= threshold`, lowest stock first.
    async fn low_stock_products(&self, threshold: i32) -> Result<Vec<ProductRow>>;
}

/// Persistence for shopping carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads the user's cart, if one has been created.
    async fn load_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Stores the cart and its items, replacing the previous item set.
    ///
    /// The write only succeeds if the stored version still equals
    /// `cart.version()`; otherwise it fails with `Conflict`. Returns the cart
    /// with its assigned id and next version.
    async fn save_cart(&self, cart: &Cart) -> Result<Cart>;
}

/// Persistence for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a new order and the emptied cart it was placed from as one unit.
    ///
    /// The cart is version-checked as in [`CartStore::save_cart`], so one
    /// cart can only be checked out once. Returns the order with its
    /// assigned id.
    async fn place_order(&self, order: &Order, emptied_cart: &Cart) -> Result<Order>;

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Returns the user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Persists the status, fulfilment and payment fields of an existing order.
    ///
    /// Fails with `Conflict` unless the stored status is still `expected`.
    async fn update_order_status(&self, order: &Order, expected: OrderStatus) -> Result<()>;
}

/// Extension trait providing convenience methods for catalog stores.
#[async_trait]
pub trait CatalogStoreExt: CatalogStore {
    /// Checks whether the category exists and is active.
    async fn category_is_active(&self, id: CategoryId) -> Result<bool> {
        Ok(self
            .find_category(id)
            .await?
            .is_some_and(|category| category.active))
    }

    /// Active products with no stock left.
    async fn out_of_stock_products(&self) -> Result<Vec<ProductRow>> {
        self.low_stock_products(0).await
    }
}

// Blanket implementation for all CatalogStore implementations
impl<T: CatalogStore + ?Sized> CatalogStoreExt for T {}
