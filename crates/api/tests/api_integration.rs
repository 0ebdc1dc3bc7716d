//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cache::{InMemoryCache, PRODUCT_TTL};
use domain::Money;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> Router {
    let state = api::create_state(InMemoryStore::new(), InMemoryCache::new(), PRODUCT_TTL);
    api::create_app(state, get_metrics_handle())
}

const ADMIN: (i64, &str) = (1, "admin");
const SELLER: (i64, &str) = (2, "seller");
const CUSTOMER: (i64, &str) = (3, "user");

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    caller: Option<(i64, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = caller {
        builder = builder
            .header("x-user-id", id.to_string())
            .header("x-user-role", role);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn money(value: &Value) -> Money {
    value.as_str().unwrap().parse().unwrap()
}

/// Creates a category as admin and returns its id.
async fn create_category(app: &Router, name: &str) -> i64 {
    let (status, json) = send(
        app,
        "POST",
        "/categories",
        Some(ADMIN),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["id"].as_i64().unwrap()
}

/// Creates a product as seller and returns its id.
async fn create_product(app: &Router, category_id: i64, name: &str, sku: &str, price: &str) -> i64 {
    let (status, json) = send(
        app,
        "POST",
        "/products",
        Some(SELLER),
        Some(json!({
            "name": name,
            "description": format!("{name} description"),
            "price": price,
            "stockQuantity": 20,
            "sku": sku,
            "categoryId": category_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_create_and_get_product() {
    let app = setup();
    let category_id = create_category(&app, "Electronics").await;
    let id = create_product(&app, category_id, "Smartphone", "SP-100", "499.99").await;

    let (status, json) = send(&app, "GET", &format!("/products/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Smartphone");
    assert_eq!(json["sku"], "SP-100");
    assert_eq!(json["categoryName"], "Electronics");
    assert_eq!(money(&json["price"]), Money::from_cents(49_999));
}

#[tokio::test]
async fn test_missing_product_is_404() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/products/999", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_invalid_product_reports_field_errors() {
    let app = setup();
    let category_id = create_category(&app, "Electronics").await;

    let (status, json) = send(
        &app,
        "POST",
        "/products",
        Some(ADMIN),
        Some(json!({
            "name": "X",
            "price": "0",
            "stockQuantity": 1,
            "sku": "lower case",
            "categoryId": category_id,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = json["fieldErrors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"price"));
    assert!(fields.contains(&"sku"));
}

#[tokio::test]
async fn test_malformed_body_is_a_json_400() {
    let app = setup();
    let category_id = create_category(&app, "Electronics").await;

    let (status, json) = send(
        &app,
        "POST",
        "/products",
        Some(SELLER),
        Some(json!({
            "name": "Laptop",
            "stockQuantity": 5,
            "sku": "LT-1",
            "categoryId": category_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("price"), "{json}");

    let (status, json) = send(
        &app,
        "POST",
        "/products",
        Some(SELLER),
        Some(json!({
            "name": "Laptop",
            "price": "10.00",
            "stockQuantity": "many",
            "sku": "LT-1",
            "categoryId": category_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);

    let request = Request::builder()
        .method("POST")
        .uri("/cart/items")
        .header("x-user-id", "3")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_product_writes_require_roles() {
    let app = setup();
    let category_id = create_category(&app, "Electronics").await;
    let body = json!({
        "name": "Smartphone",
        "price": "10.00",
        "stockQuantity": 1,
        "sku": "SP-1",
        "categoryId": category_id,
    });

    let (status, _) = send(&app, "POST", "/products", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/products", Some(CUSTOMER), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let id = create_product(&app, category_id, "Tablet", "TB-1", "20.00").await;
    let (status, _) = send(&app, "DELETE", &format!("/products/{id}"), Some(SELLER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_and_delete_product() {
    let app = setup();
    let category_id = create_category(&app, "Electronics").await;
    let id = create_product(&app, category_id, "Smartphone", "SP-100", "499.99").await;

    // Warm the cache, then update through the API
    send(&app, "GET", &format!("/products/{id}"), None, None).await;
    let (status, json) = send(
        &app,
        "PUT",
        &format!("/products/{id}"),
        Some(SELLER),
        Some(json!({ "price": "399.99" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Smartphone");

    let (_, json) = send(&app, "GET", &format!("/products/{id}"), None, None).await;
    assert_eq!(money(&json["price"]), Money::from_cents(39_999));

    let (status, _) = send(&app, "DELETE", &format!("/products/{id}"), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/products/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_products_with_filters_and_paging() {
    let app = setup();
    let electronics = create_category(&app, "Electronics").await;
    let books = create_category(&app, "Books").await;
    create_product(&app, electronics, "Smartphone X", "SP-1", "499.99").await;
    create_product(&app, electronics, "Phone Charger", "CH-1", "19.99").await;
    create_product(&app, electronics, "Laptop", "LP-1", "999.99").await;
    create_product(&app, books, "Phone Repair Guide", "BK-1", "29.99").await;

    let (status, json) = send(
        &app,
        "GET",
        "/products?category=electronics&search=phone&sortBy=price&sortDir=desc",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalElements"], 2);
    let names: Vec<&str> = json["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Smartphone X", "Phone Charger"]);

    let (_, json) = send(&app, "GET", "/products?size=3&page=1", None, None).await;
    assert_eq!(json["totalElements"], 4);
    assert_eq!(json["totalPages"], 2);
    assert_eq!(json["content"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "GET", "/products?sortBy=colour", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_category_tree() {
    let app = setup();
    let root = create_category(&app, "Home").await;
    let (status, child) = send(
        &app,
        "POST",
        "/categories",
        Some(ADMIN),
        Some(json!({ "name": "Garden Tools", "parentId": root })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(child["slug"], "garden-tools");
    assert_eq!(child["level"], 1);
    let child_id = child["id"].as_i64().unwrap();

    let (_, roots) = send(&app, "GET", "/categories/roots", None, None).await;
    assert_eq!(roots.as_array().unwrap().len(), 1);

    let (_, children) = send(&app, "GET", &format!("/categories/{root}/children"), None, None).await;
    assert_eq!(children[0]["id"], child_id);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/categories/{root}/parent"),
        Some(ADMIN),
        Some(json!({ "parentId": child_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/categories",
        Some(SELLER),
        Some(json!({ "name": "Toys" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cart_totals() {
    let app = setup();
    let category_id = create_category(&app, "Electronics").await;
    let phone = create_product(&app, category_id, "Smartphone", "SP-100", "499.99").await;
    let case = create_product(&app, category_id, "Case", "CASE-1", "19.99").await;

    let (status, _) = send(&app, "GET", "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    send(
        &app,
        "POST",
        "/cart/items",
        Some(CUSTOMER),
        Some(json!({ "productId": phone, "quantity": 1 })),
    )
    .await;
    let (status, cart) = send(
        &app,
        "POST",
        "/cart/items",
        Some(CUSTOMER),
        Some(json!({ "productId": case, "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["totalItems"], 4);
    assert_eq!(money(&cart["totalAmount"]), Money::from_cents(49_999 + 3 * 1_999));

    let (_, cart) = send(
        &app,
        "PUT",
        &format!("/cart/items/{case}"),
        Some(CUSTOMER),
        Some(json!({ "quantity": 0 })),
    )
    .await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(money(&cart["totalAmount"]), Money::from_cents(49_999));

    let (status, _) = send(&app, "DELETE", &format!("/cart/items/{case}"), Some(CUSTOMER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, cart) = send(&app, "DELETE", "/cart", Some(CUSTOMER), None).await;
    assert_eq!(cart["totalItems"], 0);
}

#[tokio::test]
async fn test_order_lifecycle() {
    let app = setup();
    let category_id = create_category(&app, "Electronics").await;
    let phone = create_product(&app, category_id, "Smartphone", "SP-100", "100.00").await;

    let (status, _) = send(&app, "POST", "/orders", Some(CUSTOMER), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app,
        "POST",
        "/cart/items",
        Some(CUSTOMER),
        Some(json!({ "productId": phone, "quantity": 2 })),
    )
    .await;
    let (status, order) = send(
        &app,
        "POST",
        "/orders",
        Some(CUSTOMER),
        Some(json!({ "shippingAmount": "5.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "PENDING");
    assert_eq!(money(&order["subtotal"]), Money::from_cents(20_000));
    assert_eq!(money(&order["taxAmount"]), Money::from_cents(2_000));
    assert_eq!(money(&order["totalAmount"]), Money::from_cents(22_500));
    let id = order["id"].as_i64().unwrap();

    let (_, cart) = send(&app, "GET", "/cart", Some(CUSTOMER), None).await;
    assert_eq!(cart["totalItems"], 0);

    // Another customer cannot see it, an admin can
    let (status, _) = send(&app, "GET", &format!("/orders/{id}"), Some((9, "user")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &format!("/orders/{id}"), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", &format!("/orders/{id}/confirm"), Some(CUSTOMER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, order) = send(
        &app,
        "POST",
        &format!("/orders/{id}/ship"),
        Some(ADMIN),
        Some(json!({ "trackingNumber": "TRACK-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "SHIPPED");
    assert_eq!(order["trackingNumber"], "TRACK-1");

    let (status, json) = send(&app, "POST", &format!("/orders/{id}/cancel"), Some(CUSTOMER), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);

    let (status, order) = send(&app, "POST", &format!("/orders/{id}/deliver"), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "DELIVERED");

    let (_, orders) = send(&app, "GET", "/orders", Some(CUSTOMER), None).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}
