//! Category service.

use common::CategoryId;
use domain::{Category, CategoryTree, NewCategory};
use store::CatalogStore;

use crate::error::{CatalogError, Result};
use crate::responses::CategoryResponse;

/// Service for managing the category tree.
#[derive(Clone)]
pub struct CategoryService<S> {
    store: S,
}

impl<S: CatalogStore> CategoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: NewCategory) -> Result<CategoryResponse> {
        request.validate()?;

        if self.store.category_name_exists(&request.name).await? {
            return Err(CatalogError::invalid(
                "name",
                format!("Category with name '{}' already exists", request.name.trim()),
            ));
        }
        let slug = request.resolved_slug();
        if self.store.category_slug_exists(&slug).await? {
            return Err(CatalogError::invalid(
                "slug",
                format!("Category with slug '{slug}' already exists"),
            ));
        }
        if let Some(parent_id) = request.parent_id {
            self.active_category(parent_id).await?;
        }

        let category = self.store.insert_category(&request).await?;
        tracing::info!(category_id = %category.id, "Category created");
        self.respond(category, &self.tree().await?).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: CategoryId) -> Result<CategoryResponse> {
        let category = self.active_category(id).await?;
        self.respond(category, &self.tree().await?).await
    }

    /// Active categories ordered by `sort_order`, then id.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CategoryResponse>> {
        let categories = self.store.list_categories().await?;
        self.respond_all(categories).await
    }

    /// Active categories without a parent.
    #[tracing::instrument(skip(self))]
    pub async fn roots(&self) -> Result<Vec<CategoryResponse>> {
        let categories = self
            .store
            .list_categories()
            .await?
            .into_iter()
            .filter(Category::is_root)
            .collect();
        self.respond_all(categories).await
    }

    /// Active direct children of an active category.
    #[tracing::instrument(skip(self))]
    pub async fn children(&self, parent_id: CategoryId) -> Result<Vec<CategoryResponse>> {
        self.active_category(parent_id).await?;
        let categories = self
            .store
            .list_categories()
            .await?
            .into_iter()
            .filter(|c| c.parent_id == Some(parent_id))
            .collect();
        self.respond_all(categories).await
    }

    /// Moves a category under `parent_id`, or to the root when `None`.
    ///
    /// Rejects a parent that is the category itself or one of its descendants.
    /// The store checks this against the links current at write time.
    #[tracing::instrument(skip(self))]
    pub async fn set_parent(
        &self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> Result<CategoryResponse> {
        self.active_category(id).await?;
        if let Some(parent_id) = parent_id {
            self.active_category(parent_id).await?;
        }

        let category = self.store.set_category_parent(id, parent_id).await?;
        tracing::info!(category_id = %id, parent_id = ?parent_id, "Category moved");
        self.respond(category, &self.tree().await?).await
    }

    /// Depth of a category: 0 for roots.
    #[tracing::instrument(skip(self))]
    pub async fn level(&self, id: CategoryId) -> Result<usize> {
        self.active_category(id).await?;
        Ok(self.tree().await?.level(id)?)
    }

    async fn active_category(&self, id: CategoryId) -> Result<Category> {
        self.store
            .find_category(id)
            .await?
            .filter(|c| c.active)
            .ok_or_else(|| CatalogError::not_found("Category", id))
    }

    async fn tree(&self) -> Result<CategoryTree> {
        Ok(CategoryTree::from_links(self.store.category_links().await?))
    }

    async fn respond(&self, category: Category, tree: &CategoryTree) -> Result<CategoryResponse> {
        let level = tree.level(category.id)?;
        let product_count = self.store.count_active_products(category.id).await?;
        Ok(CategoryResponse::new(category, level, product_count))
    }

    async fn respond_all(&self, categories: Vec<Category>) -> Result<Vec<CategoryResponse>> {
        let tree = self.tree().await?;
        let mut responses = Vec::with_capacity(categories.len());
        for category in categories {
            responses.push(self.respond(category, &tree).await?);
        }
        Ok(responses)
    }
}
