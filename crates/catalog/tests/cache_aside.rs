//! Cache-aside behavior of `ProductService`.
//!
//! The in-memory store counts single-product reads, which shows whether a
//! lookup was served from the cache or from the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cache::{Cache, CacheError, InMemoryCache, product_key};
use catalog::{CatalogError, ProductService};
use common::{CategoryId, ProductId};
use domain::{Money, NewCategory, NewProduct, ProductChanges};
use store::{CatalogStore, InMemoryStore, PageRequest, ProductQuery};

async fn seed(store: &InMemoryStore) -> (CategoryId, ProductId) {
    let category = store
        .insert_category(&NewCategory {
            name: "Electronics".to_string(),
            description: None,
            slug: None,
            parent_id: None,
            sort_order: 0,
        })
        .await
        .unwrap();

    let product = store
        .insert_product(&NewProduct {
            name: "Smartphone".to_string(),
            description: Some("A phone".to_string()),
            price: Money::from_cents(49_999),
            stock_quantity: 10,
            sku: "SP-100".to_string(),
            category_id: category.id,
        })
        .await
        .unwrap();

    (category.id, product.product.id)
}

fn service() -> (ProductService<InMemoryStore, InMemoryCache>, InMemoryStore, InMemoryCache) {
    let store = InMemoryStore::new();
    let cache = InMemoryCache::new();
    (
        ProductService::new(store.clone(), cache.clone()),
        store,
        cache,
    )
}

#[tokio::test]
async fn cold_miss_populates_and_second_read_skips_store() {
    let (service, store, cache) = service();
    let (_, id) = seed(&store).await;

    let first = service.get_by_id(id).await.unwrap();
    assert_eq!(store.product_reads(), 1);
    assert!(cache.contains(&product_key(id)).await);
    assert_eq!(first.category_name, "Electronics");

    let second = service.get_by_id(id).await.unwrap();
    assert_eq!(store.product_reads(), 1);
    assert_eq!(second, first);
}

#[tokio::test]
async fn update_invalidates_cached_entry() {
    let (service, store, cache) = service();
    let (_, id) = seed(&store).await;
    service.get_by_id(id).await.unwrap();

    let updated = service
        .update(
            id,
            ProductChanges {
                price: Some(Money::from_cents(39_999)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.price, Money::from_cents(39_999));
    assert_eq!(updated.name, "Smartphone");
    assert!(!cache.contains(&product_key(id)).await);

    let reads = store.product_reads();
    let fresh = service.get_by_id(id).await.unwrap();
    assert_eq!(store.product_reads(), reads + 1);
    assert_eq!(fresh.price, Money::from_cents(39_999));
}

#[tokio::test]
async fn delete_invalidates_and_hides_product() {
    let (service, store, cache) = service();
    let (_, id) = seed(&store).await;
    service.get_by_id(id).await.unwrap();

    service.delete(id).await.unwrap();

    assert!(!cache.contains(&product_key(id)).await);
    assert!(matches!(
        service.get_by_id(id).await,
        Err(CatalogError::NotFound {
            entity: "Product",
            ..
        })
    ));
    assert!(matches!(
        service.delete(id).await,
        Err(CatalogError::NotFound { .. })
    ));
}

#[tokio::test]
async fn missing_product_is_not_cached() {
    let (service, _store, cache) = service();
    let missing = ProductId::new(404);

    assert!(service.get_by_id(missing).await.is_err());
    assert!(!cache.contains(&product_key(missing)).await);
}

#[tokio::test]
async fn listing_never_touches_cache() {
    let (service, store, cache) = service();
    seed(&store).await;

    let page = service
        .list(&ProductQuery::All, &PageRequest::first(10))
        .await
        .unwrap();

    assert_eq!(page.total_elements, 1);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn sku_of_deleted_product_can_be_reused() {
    let (service, store, _cache) = service();
    let (category_id, id) = seed(&store).await;
    service.delete(id).await.unwrap();

    let recreated = service
        .create(NewProduct {
            name: "Smartphone 2".to_string(),
            description: None,
            price: Money::from_cents(59_999),
            stock_quantity: 1,
            sku: "SP-100".to_string(),
            category_id,
        })
        .await
        .unwrap();

    assert_ne!(recreated.id, id);
}

/// Cache whose reads and writes can be switched to fail.
#[derive(Clone, Default)]
struct FlakyCache {
    inner: InMemoryCache,
    failing: Arc<AtomicBool>,
}

impl FlakyCache {
    fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> cache::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            let err = serde_json::from_str::<()>("unavailable").unwrap_err();
            return Err(CacheError::Serialization(err));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for FlakyCache {
    async fn get(&self, key: &str) -> cache::Result<Option<String>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> cache::Result<()> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> cache::Result<()> {
        self.check()?;
        self.inner.delete(key).await
    }
}

#[tokio::test]
async fn unavailable_cache_falls_back_to_store() {
    let store = InMemoryStore::new();
    let cache = FlakyCache::default();
    let service = ProductService::new(store.clone(), cache.clone());
    let (_, id) = seed(&store).await;

    cache.fail(true);
    let product = service.get_by_id(id).await.unwrap();
    assert_eq!(product.sku, "SP-100");
    assert_eq!(store.product_reads(), 1);
}

#[tokio::test]
async fn failed_invalidation_is_reported() {
    let store = InMemoryStore::new();
    let cache = FlakyCache::default();
    let service = ProductService::new(store.clone(), cache.clone());
    let (_, id) = seed(&store).await;

    cache.fail(true);
    let result = service.delete(id).await;
    assert!(matches!(result, Err(CatalogError::Cache(_))));
}
