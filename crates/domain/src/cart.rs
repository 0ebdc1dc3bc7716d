//! Shopping cart aggregate.

use chrono::{DateTime, Utc};
use common::{CartId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::totals::{self, LineItem};

/// A product line in a cart, with the price captured when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns `unit_price × quantity`.
    pub fn subtotal(&self) -> Money {
        self.line_total()
    }
}

impl LineItem for CartItem {
    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// A user's shopping cart.
///
/// Each user owns at most one cart. Items keep insertion order and the
/// stored totals are recomputed after every mutation, so they always equal
/// the sums derived from the current items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: Option<CartId>,
    user_id: UserId,
    items: Vec<CartItem>,
    total_amount: Money,
    total_items: u32,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// Query methods
impl Cart {
    /// Creates an empty, not yet persisted cart.
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user_id,
            items: Vec::new(),
            total_amount: Money::zero(),
            total_items: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a stored cart. Totals are derived from `items`.
    pub fn restore(
        id: CartId,
        user_id: UserId,
        items: Vec<CartItem>,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut cart = Self {
            id: Some(id),
            user_id,
            items,
            total_amount: Money::zero(),
            total_items: 0,
            version,
            created_at,
            updated_at,
        };
        cart.recalculate_totals();
        cart
    }

    pub fn id(&self) -> Option<CartId> {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn get_item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    /// Number of times the cart has been stored; 0 until the first save.
    ///
    /// Stores only accept a write whose version matches the stored one.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_product(&self, product_id: ProductId) -> bool {
        self.get_item(product_id).is_some()
    }
}

// Mutations
impl Cart {
    /// Records the id and version assigned by a successful store write.
    pub fn mark_stored(&mut self, id: CartId, version: i64) {
        self.id = Some(id);
        self.version = version;
    }

    /// Adds `quantity` units of a product.
    ///
    /// If the product is already in the cart its quantity grows and the
    /// originally captured price is kept.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }

        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity += quantity;
        } else {
            self.items
                .push(CartItem::new(product_id, product_name, unit_price, quantity));
        }

        self.touch();
        Ok(())
    }

    /// Removes a product's line.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<(), DomainError> {
        let position = self
            .items
            .iter()
            .position(|item| item.product_id == product_id)
            .ok_or(DomainError::ItemNotFound { product_id })?;

        self.items.remove(position);
        self.touch();
        Ok(())
    }

    /// Sets a product's quantity; zero removes the line.
    pub fn update_item_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }

        let item = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
            .ok_or(DomainError::ItemNotFound { product_id })?;

        item.quantity = quantity;
        self.touch();
        Ok(())
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    fn touch(&mut self) {
        self.recalculate_totals();
        self.updated_at = Utc::now();
    }

    fn recalculate_totals(&mut self) {
        let totals = totals::cart_totals(&self.items);
        self.total_amount = totals.total_amount;
        self.total_items = totals.total_items;
    }
}
