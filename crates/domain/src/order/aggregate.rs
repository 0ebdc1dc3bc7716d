//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::totals::{self, LineItem};
use crate::validation::ValidationErrors;

use super::{OrderStatus, PaymentMethod, PaymentStatus};

/// A postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

impl Address {
    fn validate(&self, prefix: &'static str, errors: &mut ValidationErrors) {
        let fields = [
            (&self.street, "street"),
            (&self.city, "city"),
            (&self.state, "state"),
            (&self.country, "country"),
            (&self.zip_code, "zipCode"),
        ];
        for (value, name) in fields {
            if value.trim().is_empty() {
                errors.add(prefix, format!("{name} is required"));
            }
        }
    }
}

/// A line in an order.
///
/// Name and unit price are snapshots taken when the order was placed; later
/// product changes never reach existing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn subtotal(&self) -> Money {
        self.line_total()
    }
}

impl LineItem for OrderItem {
    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Checkout details supplied when an order is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDetails {
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub shipping_amount: Option<Money>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutDetails {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(address) = &self.shipping_address {
            address.validate("shippingAddress", &mut errors);
        }
        if let Some(address) = &self.billing_address {
            address.validate("billingAddress", &mut errors);
        }
        if let Some(shipping) = self.shipping_amount
            && shipping.is_negative()
        {
            errors.add("shippingAmount", "Shipping amount cannot be negative");
        }
        if let Some(notes) = &self.notes {
            errors.check_length("notes", notes, 0, 500);
        }
        errors.into_result()
    }
}

/// Every stored column of an order, used to rebuild it from the store.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub shipping_amount: Money,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    pub payment_transaction_id: Option<String>,
    pub order_date: DateTime<Utc>,
    pub shipped_date: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order aggregate root.
///
/// Owns its items. `subtotal`, `tax_amount` and `total_amount` are derived
/// from the items and the shipping charge after every item mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: Option<OrderId>,
    order_number: String,
    user_id: UserId,
    status: OrderStatus,
    items: Vec<OrderItem>,
    subtotal: Money,
    tax_amount: Money,
    shipping_amount: Money,
    total_amount: Money,
    shipping_address: Option<Address>,
    billing_address: Option<Address>,
    payment_method: Option<PaymentMethod>,
    payment_status: PaymentStatus,
    payment_transaction_id: Option<String>,
    order_date: DateTime<Utc>,
    shipped_date: Option<DateTime<Utc>>,
    delivered_date: Option<DateTime<Utc>>,
    tracking_number: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// Query methods
impl Order {
    pub fn id(&self) -> Option<OrderId> {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax_amount(&self) -> Money {
        self.tax_amount
    }

    pub fn shipping_amount(&self) -> Money {
        self.shipping_amount
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn shipping_address(&self) -> Option<&Address> {
        self.shipping_address.as_ref()
    }

    pub fn billing_address(&self) -> Option<&Address> {
        self.billing_address.as_ref()
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_transaction_id(&self) -> Option<&str> {
        self.payment_transaction_id.as_deref()
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn shipped_date(&self) -> Option<DateTime<Utc>> {
        self.shipped_date
    }

    pub fn delivered_date(&self) -> Option<DateTime<Utc>> {
        self.delivered_date
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

// Construction
impl Order {
    /// Starts a new pending order with no items.
    pub fn new(user_id: UserId, details: CheckoutDetails) -> Self {
        let now = Utc::now();
        let shipping_amount = details.shipping_amount.unwrap_or_default();
        Self {
            id: None,
            order_number: generate_order_number(now),
            user_id,
            status: OrderStatus::Pending,
            items: Vec::new(),
            subtotal: Money::zero(),
            tax_amount: Money::zero(),
            shipping_amount,
            total_amount: shipping_amount,
            shipping_address: details.shipping_address,
            billing_address: details.billing_address,
            payment_method: details.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_transaction_id: None,
            order_date: now,
            shipped_date: None,
            delivered_date: None,
            tracking_number: None,
            notes: details.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a stored order. Totals are derived from the items.
    pub fn restore(parts: OrderParts) -> Self {
        let mut order = Self {
            id: Some(parts.id),
            order_number: parts.order_number,
            user_id: parts.user_id,
            status: parts.status,
            items: parts.items,
            subtotal: Money::zero(),
            tax_amount: Money::zero(),
            shipping_amount: parts.shipping_amount,
            total_amount: Money::zero(),
            shipping_address: parts.shipping_address,
            billing_address: parts.billing_address,
            payment_method: parts.payment_method,
            payment_status: parts.payment_status,
            payment_transaction_id: parts.payment_transaction_id,
            order_date: parts.order_date,
            shipped_date: parts.shipped_date,
            delivered_date: parts.delivered_date,
            tracking_number: parts.tracking_number,
            notes: parts.notes,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        };
        order.recalculate_totals();
        order
    }

    /// Records the id assigned by the store.
    pub fn assign_id(&mut self, id: OrderId) {
        self.id = Some(id);
    }
}

// Item mutations
impl Order {
    /// Adds a line. Only pending orders accept item changes.
    pub fn add_item(&mut self, item: OrderItem) -> Result<(), DomainError> {
        self.ensure(self.status.can_modify_items(), "add item to")?;

        if item.quantity == 0 {
            return Err(DomainError::InvalidQuantity {
                quantity: item.quantity,
            });
        }

        self.items.push(item);
        self.recalculate_totals();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Removes every line for `product_id`.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<(), DomainError> {
        self.ensure(self.status.can_modify_items(), "remove item from")?;

        let before = self.items.len();
        self.items.retain(|item| item.product_id != product_id);
        if self.items.len() == before {
            return Err(DomainError::ItemNotFound { product_id });
        }

        self.recalculate_totals();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replaces the shipping charge while the order is pending.
    pub fn set_shipping_amount(&mut self, shipping_amount: Money) -> Result<(), DomainError> {
        self.ensure(self.status.can_modify_items(), "change shipping of")?;

        if shipping_amount.is_negative() {
            return Err(DomainError::invalid(
                "shippingAmount",
                "Shipping amount cannot be negative",
            ));
        }

        self.shipping_amount = shipping_amount;
        self.recalculate_totals();
        self.updated_at = Utc::now();
        Ok(())
    }

    fn recalculate_totals(&mut self) {
        let totals = totals::order_totals(&self.items, self.shipping_amount);
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_amount;
        self.total_amount = totals.total_amount;
    }
}

// Status transitions
impl Order {
    /// Accepts a pending order.
    pub fn confirm(&mut self) -> Result<(), DomainError> {
        self.ensure(self.status.can_confirm(), "confirm")?;
        self.status = OrderStatus::Confirmed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Cancels the order. Fails without changes once it has shipped.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.ensure(self.status.can_cancel(), "cancel")?;
        self.status = OrderStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Marks the order as shipped with the carrier's tracking number.
    pub fn mark_as_shipped(&mut self, tracking_number: impl Into<String>) -> Result<(), DomainError> {
        self.ensure(self.status.can_ship(), "ship")?;
        let now = Utc::now();
        self.status = OrderStatus::Shipped;
        self.shipped_date = Some(now);
        self.tracking_number = Some(tracking_number.into());
        self.updated_at = now;
        Ok(())
    }

    /// Marks the order as delivered.
    pub fn mark_as_delivered(&mut self) -> Result<(), DomainError> {
        self.ensure(self.status.can_deliver(), "deliver")?;
        let now = Utc::now();
        self.status = OrderStatus::Delivered;
        self.delivered_date = Some(now);
        self.updated_at = now;
        Ok(())
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), DomainError> {
        if allowed {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                current_status: self.status,
                action,
            })
        }
    }
}

/// Builds an order number of the form `ORD-<unix millis>-<4 random digits>`.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().as_u128() % 10_000;
    format!("ORD-{}-{suffix:04}", now.timestamp_millis())
}
