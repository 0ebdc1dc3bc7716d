//! Integration tests for the cart and order aggregates.
//!
//! These tests drive long mutation sequences and check that the stored
//! totals always match the totals derived from the current items.

use common::{ProductId, UserId};
use domain::{
    Cart, CheckoutDetails, DomainError, Money, Order, OrderItem, OrderStatus, TAX_RATE,
};

/// Deterministic pseudo-random sequence so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (self.0 >> 33) % bound
    }
}

fn derived_cart_total(cart: &Cart) -> (Money, u32) {
    let amount = cart
        .items()
        .iter()
        .map(|item| item.unit_price.multiply(item.quantity))
        .sum();
    let quantity = cart.items().iter().map(|item| item.quantity).sum();
    (amount, quantity)
}

mod cart_totals {
    use super::*;

    #[test]
    fn random_mutation_sequences_keep_totals_exact() {
        for seed in 1..=20 {
            let mut rng = Lcg(seed);
            let mut cart = Cart::new(UserId::new(seed as i64));

            for _ in 0..200 {
                let product = ProductId::new(rng.next(8) as i64 + 1);
                match rng.next(4) {
                    0 | 1 => {
                        let price = Money::from_cents(rng.next(100_000) as i64 + 1);
                        let quantity = rng.next(5) as u32 + 1;
                        cart.add_item(product, "Item", price, quantity).unwrap();
                    }
                    2 => {
                        let _ = cart.update_item_quantity(product, rng.next(4) as u32);
                    }
                    _ => {
                        let _ = cart.remove_item(product);
                    }
                }

                let (amount, quantity) = derived_cart_total(&cart);
                assert_eq!(cart.total_amount(), amount);
                assert_eq!(cart.total_items(), quantity);
            }
        }
    }

    #[test]
    fn failed_mutation_leaves_totals_untouched() {
        let mut cart = Cart::new(UserId::new(1));
        cart.add_item(ProductId::new(1), "Widget", Money::from_cents(1000), 2)
            .unwrap();
        let before = cart.clone();

        assert!(cart.remove_item(ProductId::new(2)).is_err());
        assert!(
            cart.add_item(ProductId::new(3), "Gadget", Money::from_cents(1), 0)
                .is_err()
        );

        assert_eq!(cart.items(), before.items());
        assert_eq!(cart.total_amount(), before.total_amount());
    }
}

mod order_lifecycle {
    use super::*;

    fn order_from_cart(cart: &Cart, shipping_cents: i64) -> Order {
        let mut order = Order::new(
            cart.user_id(),
            CheckoutDetails {
                shipping_amount: Some(Money::from_cents(shipping_cents)),
                ..Default::default()
            },
        );
        for item in cart.items() {
            order
                .add_item(OrderItem::new(
                    item.product_id,
                    item.product_name.clone(),
                    item.quantity,
                    item.unit_price,
                ))
                .unwrap();
        }
        order
    }

    #[test]
    fn order_snapshots_cart_prices() {
        let mut cart = Cart::new(UserId::new(1));
        cart.add_item(ProductId::new(1), "Widget A", Money::from_cents(1000), 2)
            .unwrap();
        cart.add_item(ProductId::new(2), "Widget B", Money::from_cents(500), 1)
            .unwrap();

        let order = order_from_cart(&cart, 750);

        assert_eq!(order.subtotal(), cart.total_amount());
        assert_eq!(order.tax_amount(), Money::from_cents(250));
        assert_eq!(order.total_amount(), Money::from_cents(2500 + 250 + 750));
        assert_eq!(order.total_quantity(), cart.total_items());
    }

    #[test]
    fn order_total_formula_holds_for_random_items() {
        let mut rng = Lcg(99);
        let mut order = Order::new(UserId::new(1), CheckoutDetails::default());

        for i in 0..50 {
            order
                .add_item(OrderItem::new(
                    ProductId::new(i),
                    "Item",
                    rng.next(9) as u32 + 1,
                    Money::from_cents(rng.next(50_000) as i64 + 1),
                ))
                .unwrap();

            let subtotal = order.subtotal();
            assert_eq!(
                order.total_amount(),
                subtotal + subtotal.times_rate(TAX_RATE) + order.shipping_amount()
            );
        }
    }

    #[test]
    fn complete_order_lifecycle() {
        let mut order = Order::new(UserId::new(7), CheckoutDetails::default());
        order
            .add_item(OrderItem::new(
                ProductId::new(1),
                "Widget",
                1,
                Money::from_cents(1000),
            ))
            .unwrap();

        order.confirm().unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);

        order.mark_as_shipped("TRACK-789").unwrap();
        assert_eq!(order.status(), OrderStatus::Shipped);

        order.mark_as_delivered().unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert!(order.status().is_terminal());
    }

    #[test]
    fn confirm_twice_is_invalid() {
        let mut order = Order::new(UserId::new(7), CheckoutDetails::default());
        order.confirm().unwrap();

        let err = order.confirm().unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidStateTransition {
                current_status: OrderStatus::Confirmed,
                ..
            }
        ));
    }

    #[test]
    fn cancelled_order_stays_cancelled() {
        let mut order = Order::new(UserId::new(7), CheckoutDetails::default());
        order.cancel().unwrap();

        assert!(order.cancel().is_err());
        assert!(order.confirm().is_err());
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }
}
