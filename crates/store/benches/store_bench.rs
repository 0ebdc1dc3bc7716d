use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Money, NewCategory, NewProduct};
use store::{CatalogStore, InMemoryStore, PageRequest, ProductQuery};

fn seeded_store(rt: &tokio::runtime::Runtime, products: i64) -> InMemoryStore {
    let store = InMemoryStore::new();
    rt.block_on(async {
        let mut categories = Vec::new();
        for name in ["Electronics", "Books", "Garden"] {
            let category = store
                .insert_category(&NewCategory {
                    name: name.to_string(),
                    description: None,
                    slug: None,
                    parent_id: None,
                    sort_order: 0,
                })
                .await
                .unwrap();
            categories.push(category.id);
        }

        for i in 0..products {
            let name = if i % 4 == 0 {
                format!("Phone {i}")
            } else {
                format!("Widget {i}")
            };
            store
                .insert_product(&NewProduct {
                    name,
                    description: Some("Benchmark product".to_string()),
                    price: Money::from_cents(100 + i * 7 % 5_000),
                    stock_quantity: (i % 50) as i32,
                    sku: format!("SKU-{i}"),
                    category_id: categories[(i % 3) as usize],
                })
                .await
                .unwrap();
        }
    });
    store
}

fn bench_list_all(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = seeded_store(&rt, 1_000);
    let page = PageRequest::first(20);

    c.bench_function("store/list_all_first_page", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .query_products(&ProductQuery::All, &page)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_list_filtered_sorted(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = seeded_store(&rt, 1_000);
    let page = PageRequest::new(0, 20, "price", "desc").unwrap();
    let query = ProductQuery::from_filters(Some("electronics"), Some("phone"));

    c.bench_function("store/list_category_and_search_by_price", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.query_products(&query, &page).await.unwrap();
            });
        });
    });
}

fn bench_find_product(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = seeded_store(&rt, 1_000);

    c.bench_function("store/find_active_product", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .find_active_product(common::ProductId::new(500))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_list_all,
    bench_list_filtered_sorted,
    bench_find_product
);
criterion_main!(benches);
