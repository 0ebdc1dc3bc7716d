//! Total recalculation for carts and orders.
//!
//! Every function here is pure: totals are derived from the current line
//! items alone, so an aggregate can call them after each mutation without
//! carrying any running state. Empty item collections produce zero totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Flat tax rate applied to order subtotals (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// A line item with a captured unit price and a quantity.
pub trait LineItem {
    /// Price per unit captured when the item was added.
    fn unit_price(&self) -> Money;

    /// Number of units.
    fn quantity(&self) -> u32;

    /// Returns `unit_price × quantity`.
    fn line_total(&self) -> Money {
        self.unit_price().multiply(self.quantity())
    }
}

/// Derived totals of a shopping cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of all line totals.
    pub total_amount: Money,
    /// Sum of all quantities.
    pub total_items: u32,
}

/// Derived totals of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Sum of all line totals.
    pub subtotal: Money,
    /// `subtotal × TAX_RATE`.
    pub tax_amount: Money,
    /// Externally supplied shipping charge.
    pub shipping_amount: Money,
    /// `subtotal + tax_amount + shipping_amount`.
    pub total_amount: Money,
}

/// Sums the line totals of `items`.
pub fn subtotal<'a, I, T>(items: I) -> Money
where
    I: IntoIterator<Item = &'a T>,
    T: LineItem + 'a,
{
    items.into_iter().map(LineItem::line_total).sum()
}

/// Returns the tax owed on `subtotal`.
pub fn tax_for(subtotal: Money) -> Money {
    subtotal.times_rate(TAX_RATE)
}

/// Computes cart totals: amount and item count.
pub fn cart_totals<T: LineItem>(items: &[T]) -> CartTotals {
    CartTotals {
        total_amount: subtotal(items),
        total_items: items.iter().map(LineItem::quantity).sum(),
    }
}

/// Computes order totals with tax and the given shipping charge.
pub fn order_totals<T: LineItem>(items: &[T], shipping_amount: Money) -> OrderTotals {
    let subtotal = subtotal(items);
    let tax_amount = tax_for(subtotal);
    OrderTotals {
        subtotal,
        tax_amount,
        shipping_amount,
        total_amount: subtotal + tax_amount + shipping_amount,
    }
}
