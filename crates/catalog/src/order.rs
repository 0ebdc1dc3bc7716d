//! Order service providing checkout and fulfilment operations.

use common::{OrderId, UserId};
use domain::{CheckoutDetails, DomainError, Order, OrderItem};
use store::{CartStore, OrderStore};

use crate::error::{CatalogError, Result};
use crate::responses::OrderResponse;

/// Service for placing orders and moving them through their lifecycle.
#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
}

impl<S: CartStore + OrderStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Converts the user's cart into a pending order and empties the cart.
    ///
    /// Item names and unit prices are copied from the cart, so later product
    /// changes never reach the order.
    #[tracing::instrument(skip(self, details))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        details: CheckoutDetails,
    ) -> Result<OrderResponse> {
        details.validate()?;

        let cart = self
            .store
            .load_cart(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(DomainError::EmptyCart)?;

        let mut order = Order::new(user_id, details);
        for item in cart.items() {
            order.add_item(OrderItem::new(
                item.product_id,
                item.product_name.clone(),
                item.quantity,
                item.unit_price,
            ))?;
        }

        let mut emptied = cart;
        emptied.clear();

        let order = self.store.place_order(&order, &emptied).await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            order_number = order.order_number(),
            total = %order.total_amount(),
            "Order placed"
        );
        Ok(OrderResponse::from(&order))
    }

    /// Loads an order. With `owner` set, orders of other users are reported
    /// as missing.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: OrderId, owner: Option<UserId>) -> Result<OrderResponse> {
        let order = self.load(id, owner).await?;
        Ok(OrderResponse::from(&order))
    }

    /// The user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderResponse>> {
        let orders = self.store.list_orders_for_user(user_id).await?;
        Ok(orders.iter().map(OrderResponse::from).collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, id: OrderId) -> Result<OrderResponse> {
        self.transition(id, None, "confirm", Order::confirm).await
    }

    /// Cancels a pending or confirmed order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: OrderId, owner: Option<UserId>) -> Result<OrderResponse> {
        self.transition(id, owner, "cancel", Order::cancel).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn ship(&self, id: OrderId, tracking_number: String) -> Result<OrderResponse> {
        let tracking_number = tracking_number.trim().to_string();
        if tracking_number.is_empty() {
            return Err(CatalogError::invalid(
                "trackingNumber",
                "Tracking number is required",
            ));
        }

        self.transition(id, None, "ship", move |order| {
            order.mark_as_shipped(tracking_number)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn deliver(&self, id: OrderId) -> Result<OrderResponse> {
        self.transition(id, None, "deliver", Order::mark_as_delivered)
            .await
    }

    async fn load(&self, id: OrderId, owner: Option<UserId>) -> Result<Order> {
        self.store
            .find_order(id)
            .await?
            .filter(|order| owner.is_none_or(|user| order.user_id() == user))
            .ok_or_else(|| CatalogError::not_found("Order", id))
    }

    async fn transition<F>(
        &self,
        id: OrderId,
        owner: Option<UserId>,
        transition: &'static str,
        apply: F,
    ) -> Result<OrderResponse>
    where
        F: FnOnce(&mut Order) -> std::result::Result<(), DomainError> + Send,
    {
        let mut order = self.load(id, owner).await?;
        let from = order.status();

        apply(&mut order)?;
        self.store.update_order_status(&order, from).await?;

        metrics::counter!("order_transitions_total", "transition" => transition).increment(1);
        tracing::info!(order_id = %id, transition, %from, to = %order.status(), "Order status changed");
        Ok(OrderResponse::from(&order))
    }
}
