//! Response types returned by the services.
//!
//! Field names serialize in camelCase. `ProductResponse` is also the value
//! stored in the product cache, so it round-trips through JSON.

use chrono::{DateTime, Utc};
use common::{CartId, CategoryId, OrderId, ProductId, UserId};
use domain::{
    Address, Cart, CartItem, Category, Money, Order, OrderItem, OrderStatus, PaymentMethod,
    PaymentStatus,
};
use serde::{Deserialize, Serialize};
use store::ProductRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock_quantity: i32,
    pub sku: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductResponse {
    fn from(row: ProductRow) -> Self {
        let ProductRow {
            product,
            category_name,
        } = row;
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock_quantity: product.stock_quantity,
            sku: product.sku,
            category_id: product.category_id,
            category_name,
            active: product.active,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    /// Depth in the tree; roots are level 0.
    pub level: usize,
    pub sort_order: i32,
    pub active: bool,
    /// Number of active products in this category.
    pub product_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryResponse {
    pub fn new(category: Category, level: usize, product_count: u64) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            slug: category.slug,
            parent_id: category.parent_id,
            level,
            sort_order: category.sort_order,
            active: category.active,
            product_count,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub subtotal: Money,
}

impl From<&CartItem> for CartItemResponse {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            subtotal: item.subtotal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<CartId>,
    pub user_id: UserId,
    pub items: Vec<CartItemResponse>,
    pub total_amount: Money,
    pub total_items: u32,
    pub updated_at: DateTime<Utc>,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        Self {
            id: cart.id(),
            user_id: cart.user_id(),
            items: cart.items().iter().map(CartItemResponse::from).collect(),
            total_amount: cart.total_amount(),
            total_items: cart.total_items(),
            updated_at: cart.updated_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderId>,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub total_amount: Money,
    pub total_quantity: u32,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    pub order_date: DateTime<Utc>,
    pub shipped_date: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            order_number: order.order_number().to_string(),
            user_id: order.user_id(),
            status: order.status(),
            items: order.items().iter().map(OrderItemResponse::from).collect(),
            subtotal: order.subtotal(),
            tax_amount: order.tax_amount(),
            shipping_amount: order.shipping_amount(),
            total_amount: order.total_amount(),
            total_quantity: order.total_quantity(),
            shipping_address: order.shipping_address().cloned(),
            billing_address: order.billing_address().cloned(),
            payment_method: order.payment_method(),
            payment_status: order.payment_status(),
            order_date: order.order_date(),
            shipped_date: order.shipped_date(),
            delivered_date: order.delivered_date(),
            tracking_number: order.tracking_number().map(str::to_string),
            notes: order.notes().map(str::to_string),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}
