//! Shopping cart service.

use common::{ProductId, UserId};
use domain::{Cart, DomainError};
use store::{CartStore, CatalogStore, ProductRow, StoreError};

use crate::error::{CatalogError, Result};
use crate::responses::CartResponse;

/// Service for per-user cart operations.
///
/// Every mutation goes through the [`Cart`] aggregate, so the stored totals
/// are recomputed before the cart is persisted. Writes are version-checked:
/// a mutation racing another one on the same cart fails with
/// [`CatalogError::Conflict`] instead of overwriting it.
#[derive(Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S: CatalogStore + CartStore> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, creating an empty one on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, user_id: UserId) -> Result<CartResponse> {
        let cart = match self.store.load_cart(user_id).await? {
            Some(cart) => cart,
            None => match self.store.save_cart(&Cart::new(user_id)).await {
                Ok(cart) => cart,
                // A concurrent request created it first
                Err(StoreError::Conflict { .. }) => self.load_or_new(user_id).await?,
                Err(err) => return Err(err.into()),
            },
        };
        Ok(CartResponse::from(&cart))
    }

    /// Adds units of an active product at its current price.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartResponse> {
        let quantity = positive_quantity(quantity)?;
        let row = self.active_product(product_id).await?;
        let mut cart = self.load_or_new(user_id).await?;

        let in_cart = cart.get_item(product_id).map_or(0, |item| item.quantity);
        check_stock(&row, in_cart.saturating_add(quantity))?;

        cart.add_item(
            product_id,
            row.product.name.clone(),
            row.product.price,
            quantity,
        )?;

        let cart = self.store.save_cart(&cart).await?;
        Ok(CartResponse::from(&cart))
    }

    /// Sets a product's quantity; zero or less removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartResponse> {
        let mut cart = self.load_or_new(user_id).await?;

        if quantity <= 0 {
            cart.remove_item(product_id)?;
        } else {
            let quantity = positive_quantity(quantity)?;
            if !cart.has_product(product_id) {
                return Err(DomainError::ItemNotFound { product_id }.into());
            }
            let row = self.active_product(product_id).await?;
            check_stock(&row, quantity)?;
            cart.update_item_quantity(product_id, quantity)?;
        }

        let cart = self.store.save_cart(&cart).await?;
        Ok(CartResponse::from(&cart))
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<CartResponse> {
        let mut cart = self.load_or_new(user_id).await?;
        cart.remove_item(product_id)?;
        let cart = self.store.save_cart(&cart).await?;
        Ok(CartResponse::from(&cart))
    }

    /// Removes every item from the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<CartResponse> {
        let mut cart = self.load_or_new(user_id).await?;
        cart.clear();
        let cart = self.store.save_cart(&cart).await?;
        Ok(CartResponse::from(&cart))
    }

    async fn load_or_new(&self, user_id: UserId) -> Result<Cart> {
        Ok(self
            .store
            .load_cart(user_id)
            .await?
            .unwrap_or_else(|| Cart::new(user_id)))
    }

    async fn active_product(&self, product_id: ProductId) -> Result<ProductRow> {
        self.store
            .find_active_product(product_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Product", product_id))
    }
}

fn positive_quantity(quantity: i64) -> Result<u32> {
    match u32::try_from(quantity) {
        Ok(q) if q > 0 => Ok(q),
        _ => Err(CatalogError::invalid(
            "quantity",
            "Quantity must be at least 1",
        )),
    }
}

fn check_stock(row: &ProductRow, wanted: u32) -> Result<()> {
    let available = u32::try_from(row.product.stock_quantity).unwrap_or(0);
    if wanted > available {
        return Err(CatalogError::invalid(
            "quantity",
            format!(
                "Insufficient stock for '{}': {available} available",
                row.product.name
            ),
        ));
    }
    Ok(())
}
