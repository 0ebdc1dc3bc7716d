//! Product service with cache-aside single-product lookups.

use std::time::Duration;

use cache::{Cache, CacheExt, PRODUCT_TTL, product_key};
use common::ProductId;
use domain::{NewProduct, ProductChanges};
use store::{CatalogStore, CatalogStoreExt, Page, PageRequest, ProductQuery};

use crate::error::{CatalogError, Result};
use crate::responses::ProductResponse;

/// Service for managing catalog products.
///
/// `get_by_id` reads through the cache: a hit never touches the store, a
/// miss loads the active product and populates `product:<id>`. Updates and
/// deletes remove the cached entry after the store commits. Listings always
/// go to the store.
///
/// A read that misses concurrently with a write can repopulate the entry
/// with the pre-write value; that entry lives until its TTL runs out.
#[derive(Clone)]
pub struct ProductService<S, C> {
    store: S,
    cache: C,
    ttl: Duration,
}

impl<S: CatalogStore, C: Cache> ProductService<S, C> {
    /// Creates a service caching products for the default TTL.
    pub fn new(store: S, cache: C) -> Self {
        Self::with_ttl(store, cache, PRODUCT_TTL)
    }

    pub fn with_ttl(store: S, cache: C, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns an active product, serving repeat reads from the cache.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: ProductId) -> Result<ProductResponse> {
        let key = product_key(id);

        match self.cache.get_json::<ProductResponse>(&key).await {
            Ok(Some(cached)) => {
                metrics::counter!("product_cache_hits_total").increment(1);
                tracing::debug!(%key, "product cache hit");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(%key, error = %e, "product cache read failed, loading from store"),
        }

        metrics::counter!("product_cache_misses_total").increment(1);
        tracing::debug!(%key, "product cache miss");

        let response: ProductResponse = self
            .store
            .find_active_product(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Product", id))?
            .into();

        if let Err(e) = self.cache.set_json(&key, &response, self.ttl).await {
            tracing::warn!(%key, error = %e, "failed to populate product cache");
        }

        Ok(response)
    }

    /// Lists active products matching `query`. Never cached.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        query: &ProductQuery,
        page: &PageRequest,
    ) -> Result<Page<ProductResponse>> {
        let rows = self.store.query_products(query, page).await?;
        Ok(rows.map(ProductResponse::from))
    }

    /// Creates an active product.
    #[tracing::instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create(&self, request: NewProduct) -> Result<ProductResponse> {
        request.validate()?;

        if !self.store.category_is_active(request.category_id).await? {
            return Err(CatalogError::not_found("Category", request.category_id));
        }
        if self.store.sku_exists(&request.sku, None).await? {
            return Err(CatalogError::invalid(
                "sku",
                format!("Product with SKU '{}' already exists", request.sku),
            ));
        }

        let row = self.store.insert_product(&request).await?;
        tracing::info!(product_id = %row.product.id, "Product created");
        Ok(row.into())
    }

    /// Overwrites the provided fields of an active product.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update(&self, id: ProductId, changes: ProductChanges) -> Result<ProductResponse> {
        changes.validate()?;

        if self.store.find_active_product(id).await?.is_none() {
            return Err(CatalogError::not_found("Product", id));
        }
        if let Some(category_id) = changes.category_id
            && !self.store.category_is_active(category_id).await?
        {
            return Err(CatalogError::not_found("Category", category_id));
        }
        if let Some(sku) = &changes.sku
            && self.store.sku_exists(sku, Some(id)).await?
        {
            return Err(CatalogError::invalid(
                "sku",
                format!("Product with SKU '{sku}' already exists"),
            ));
        }

        let row = self.store.update_product(id, &changes).await?;
        self.invalidate(id).await?;

        tracing::info!(product_id = %id, "Product updated");
        Ok(row.into())
    }

    /// Soft-deletes an active product.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        self.store.soft_delete_product(id).await?;
        self.invalidate(id).await?;

        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Active products with at most `threshold` units in stock.
    #[tracing::instrument(skip(self))]
    pub async fn low_stock(&self, threshold: i32) -> Result<Vec<ProductResponse>> {
        if threshold < 0 {
            return Err(CatalogError::invalid(
                "threshold",
                "Threshold cannot be negative",
            ));
        }
        let rows = self.store.low_stock_products(threshold).await?;
        Ok(rows.into_iter().map(ProductResponse::from).collect())
    }

    /// Active products with no stock left.
    #[tracing::instrument(skip(self))]
    pub async fn out_of_stock(&self) -> Result<Vec<ProductResponse>> {
        let rows = self.store.out_of_stock_products().await?;
        Ok(rows.into_iter().map(ProductResponse::from).collect())
    }

    async fn invalidate(&self, id: ProductId) -> Result<()> {
        let key = product_key(id);
        if let Err(e) = self.cache.delete(&key).await {
            tracing::error!(%key, error = %e, "failed to invalidate product cache");
            return Err(e.into());
        }
        metrics::counter!("product_cache_invalidations_total").increment(1);
        tracing::debug!(%key, "product cache invalidated");
        Ok(())
    }
}
