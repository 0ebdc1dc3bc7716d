//! Typed access through `CacheExt`.

use std::time::Duration;

use cache::{Cache, CacheError, CacheExt, InMemoryCache, product_key};
use common::ProductId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedProduct {
    id: i64,
    name: String,
    category_name: String,
}

#[tokio::test]
async fn json_values_round_trip() {
    let cache = InMemoryCache::new();
    let key = product_key(ProductId::new(7));
    let product = CachedProduct {
        id: 7,
        name: "Smartphone".to_string(),
        category_name: "Electronics".to_string(),
    };

    cache
        .set_json(&key, &product, Duration::from_secs(60))
        .await
        .unwrap();

    let raw = cache.get(&key).await.unwrap().unwrap();
    assert!(raw.contains("\"categoryName\":\"Electronics\""));

    let cached: Option<CachedProduct> = cache.get_json(&key).await.unwrap();
    assert_eq!(cached, Some(product));
}

#[tokio::test]
async fn missing_key_is_none() {
    let cache = InMemoryCache::new();
    let cached: Option<CachedProduct> = cache.get_json("product:404").await.unwrap();
    assert!(cached.is_none());
}

#[tokio::test]
async fn malformed_value_is_a_serialization_error() {
    let cache = InMemoryCache::new();
    cache
        .set("product:1", "not json".to_string(), Duration::from_secs(60))
        .await
        .unwrap();

    let result = cache.get_json::<CachedProduct>("product:1").await;
    assert!(matches!(result, Err(CacheError::Serialization(_))));
}
