//! HTTP API server with observability for the catalog backend.
//!
//! Provides REST endpoints for products, categories, carts and orders,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post, put};
use cache::Cache;
use catalog::{CartService, CategoryService, OrderService, ProductService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{CartStore, CatalogStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Store backends usable by the HTTP layer.
pub trait AppStore: CatalogStore + CartStore + OrderStore + Clone + 'static {}

impl<T> AppStore for T where T: CatalogStore + CartStore + OrderStore + Clone + 'static {}

/// Cache backends usable by the HTTP layer.
pub trait AppCache: Cache + Clone + 'static {}

impl<T> AppCache for T where T: Cache + Clone + 'static {}

/// Shared application state accessible from all handlers.
pub struct AppState<S, C> {
    pub products: ProductService<S, C>,
    pub categories: CategoryService<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
}

/// Builds the services over one store and one cache.
pub fn create_state<S: AppStore, C: AppCache>(
    store: S,
    cache: C,
    product_cache_ttl: Duration,
) -> Arc<AppState<S, C>> {
    Arc::new(AppState {
        products: ProductService::with_ttl(store.clone(), cache, product_cache_ttl),
        categories: CategoryService::new(store.clone()),
        carts: CartService::new(store.clone()),
        orders: OrderService::new(store),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: AppStore, C: AppCache>(
    state: Arc<AppState<S, C>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{cart, categories, orders, products};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Products
        .route(
            "/products",
            get(products::list::<S, C>).post(products::create::<S, C>),
        )
        .route("/products/low-stock", get(products::low_stock::<S, C>))
        .route("/products/out-of-stock", get(products::out_of_stock::<S, C>))
        .route(
            "/products/{id}",
            get(products::get::<S, C>)
                .put(products::update::<S, C>)
                .delete(products::remove::<S, C>),
        )
        // Categories
        .route(
            "/categories",
            get(categories::list::<S, C>).post(categories::create::<S, C>),
        )
        .route("/categories/roots", get(categories::roots::<S, C>))
        .route("/categories/{id}", get(categories::get::<S, C>))
        .route(
            "/categories/{id}/children",
            get(categories::children::<S, C>),
        )
        .route("/categories/{id}/parent", put(categories::set_parent::<S, C>))
        // Cart
        .route("/cart", get(cart::get::<S, C>).delete(cart::clear::<S, C>))
        .route("/cart/items", post(cart::add_item::<S, C>))
        .route(
            "/cart/items/{product_id}",
            put(cart::update_item::<S, C>).delete(cart::remove_item::<S, C>),
        )
        // Orders
        .route(
            "/orders",
            get(orders::list::<S, C>).post(orders::place::<S, C>),
        )
        .route("/orders/{id}", get(orders::get::<S, C>))
        .route("/orders/{id}/confirm", post(orders::confirm::<S, C>))
        .route("/orders/{id}/cancel", post(orders::cancel::<S, C>))
        .route("/orders/{id}/ship", post(orders::ship::<S, C>))
        .route("/orders/{id}/deliver", post(orders::deliver::<S, C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
