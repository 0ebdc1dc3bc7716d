//! Catalog products.

use chrono::{DateTime, Utc};
use common::{CategoryId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::validation::ValidationErrors;

/// Smallest price a request may set.
pub const MIN_PRICE: Money = Money::new(Decimal::from_parts(1, 0, 0, false, 2));
/// Largest price a request may set.
pub const MAX_PRICE: Money = Money::new(Decimal::from_parts(99_999_999, 0, 0, false, 2));
/// Largest stock quantity a request may set.
pub const MAX_STOCK: i32 = 999_999;

/// A catalog product row.
///
/// Products are never physically removed; deleting one clears `active`,
/// which hides it from every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock_quantity: i32,
    pub sku: String,
    pub category_id: CategoryId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Overwrites every field that `changes` provides.
    pub fn apply_changes(&mut self, changes: &ProductChanges, now: DateTime<Utc>) {
        if let Some(name) = &changes.name {
            self.name.clone_from(name);
        }
        if let Some(description) = &changes.description {
            self.description = Some(description.clone());
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(stock_quantity) = changes.stock_quantity {
            self.stock_quantity = stock_quantity;
        }
        if let Some(sku) = &changes.sku {
            self.sku.clone_from(sku);
        }
        if let Some(category_id) = changes.category_id {
            self.category_id = category_id;
        }
        self.updated_at = now;
    }

    /// Returns true if the product has no stock left.
    pub fn is_out_of_stock(&self) -> bool {
        self.stock_quantity == 0
    }
}

/// Fields required to create a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub stock_quantity: i32,
    pub sku: String,
    pub category_id: CategoryId,
}

impl NewProduct {
    /// Checks every field constraint, collecting all violations.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_required_text("name", &self.name, 2, 255);
        if let Some(description) = &self.description {
            errors.check_length("description", description, 0, 2000);
        }
        check_price(&mut errors, self.price);
        check_stock(&mut errors, self.stock_quantity);
        check_sku(&mut errors, &self.sku);
        check_category_id(&mut errors, self.category_id);
        errors.into_result()
    }
}

/// Partial product update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub stock_quantity: Option<i32>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl ProductChanges {
    /// Checks the constraints of every provided field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.check_length("name", name, 2, 255);
        }
        if let Some(description) = &self.description {
            errors.check_length("description", description, 0, 2000);
        }
        if let Some(price) = self.price {
            check_price(&mut errors, price);
        }
        if let Some(stock_quantity) = self.stock_quantity {
            check_stock(&mut errors, stock_quantity);
        }
        if let Some(sku) = &self.sku {
            check_sku(&mut errors, sku);
        }
        if let Some(category_id) = self.category_id {
            check_category_id(&mut errors, category_id);
        }
        errors.into_result()
    }

    pub fn is_empty(&self) -> bool {
        self == &ProductChanges::default()
    }
}

/// Returns true if `sku` only uses uppercase ASCII letters, digits, `-` and `_`.
pub fn is_valid_sku(sku: &str) -> bool {
    !sku.is_empty()
        && sku
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

fn check_price(errors: &mut ValidationErrors, price: Money) {
    if price < MIN_PRICE {
        errors.add("price", "Product price must be greater than 0");
    } else if price > MAX_PRICE {
        errors.add("price", "Product price cannot exceed 999,999.99");
    }
}

fn check_stock(errors: &mut ValidationErrors, stock_quantity: i32) {
    if stock_quantity < 0 {
        errors.add("stockQuantity", "Stock quantity cannot be negative");
    } else if stock_quantity > MAX_STOCK {
        errors.add("stockQuantity", "Stock quantity cannot exceed 999,999");
    }
}

fn check_sku(errors: &mut ValidationErrors, sku: &str) {
    let len = sku.chars().count();
    if !(3..=50).contains(&len) {
        errors.add("sku", "SKU must be between 3 and 50 characters");
    }
    if !is_valid_sku(sku) {
        errors.add(
            "sku",
            "SKU can only contain uppercase letters, numbers, hyphens and underscores",
        );
    }
}

fn check_category_id(errors: &mut ValidationErrors, category_id: CategoryId) {
    if category_id.as_i64() <= 0 {
        errors.add("categoryId", "Category ID must be a positive number");
    }
}
