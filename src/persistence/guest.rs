//! Guest cart backed by local storage.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    errors::{CartError, ValidationError},
    ids::{LineItemId, VariantId},
    items::{CartLineItem, ProductContext},
    storage::{CART_KEY, LocalStorage, StorageError, read_json, write_json},
};

use super::CartPersistence;

/// Stored shape of the guest cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCart {
    #[serde(default)]
    pub cart_items: Vec<CartLineItem>,
}

impl GuestCart {
    /// Id for a new line: one past the highest id in use, starting at 1.
    #[must_use]
    pub fn next_id(&self) -> LineItemId {
        self.cart_items
            .iter()
            .map(|item| item.id)
            .max()
            .map_or(LineItemId::new(1), LineItemId::next)
    }
}

/// Guest cart persisted under the `cart` key.
#[derive(Debug, Clone)]
pub struct GuestCartStore {
    storage: Arc<dyn LocalStorage>,
}

impl GuestCartStore {
    /// Guest cart over the given storage.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Read the stored cart; a missing key is an empty cart.
    ///
    /// # Errors
    ///
    /// Fails when storage cannot be read or the stored cart is corrupt.
    pub fn read(&self) -> Result<GuestCart, StorageError> {
        Ok(read_json(self.storage.as_ref(), CART_KEY)?.unwrap_or_default())
    }

    fn write(&self, cart: &GuestCart) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), CART_KEY, cart)
    }

    /// Delete the stored cart.
    ///
    /// # Errors
    ///
    /// Fails when storage cannot be written.
    pub fn purge(&self) -> Result<(), StorageError> {
        self.storage.remove(CART_KEY)
    }
}

#[async_trait]
impl CartPersistence for GuestCartStore {
    async fn load_cart(&self) -> Result<Vec<CartLineItem>, CartError> {
        Ok(self.read()?.cart_items)
    }

    async fn add_item(
        &self,
        product: &ProductContext,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(ValidationError::QuantityBelowMinimum {
                requested: quantity,
            }
            .into());
        }

        let mut cart = self.read()?;

        if let Some(existing) = cart
            .cart_items
            .iter_mut()
            .find(|item| item.variant_id == variant_id)
        {
            let requested = existing.quantity.saturating_add(quantity);

            if requested > product.available_quantity {
                return Err(ValidationError::QuantityExceedsStock {
                    requested,
                    available: product.available_quantity,
                }
                .into());
            }

            existing.quantity = requested;

            debug!(item_id = %existing.id, quantity = existing.quantity, "merged guest cart line");
        } else {
            if quantity > product.available_quantity {
                return Err(ValidationError::QuantityExceedsStock {
                    requested: quantity,
                    available: product.available_quantity,
                }
                .into());
            }

            let id = cart.next_id();

            cart.cart_items
                .push(product.to_line_item(id, variant_id, quantity));

            debug!(item_id = %id, %variant_id, quantity, "appended guest cart line");
        }

        self.write(&cart)?;

        Ok(())
    }

    async fn remove_item(&self, item_id: LineItemId) -> Result<(), CartError> {
        let mut cart = self.read()?;

        cart.cart_items.retain(|item| item.id != item_id);

        self.write(&cart)?;

        Ok(())
    }

    async fn update_quantity(
        &self,
        item_id: LineItemId,
        _variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(ValidationError::QuantityBelowMinimum {
                requested: quantity,
            }
            .into());
        }

        let mut cart = self.read()?;

        let item = cart
            .cart_items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(ValidationError::ItemNotFound { item_id })?;

        if quantity > item.available_quantity {
            return Err(ValidationError::QuantityExceedsStock {
                requested: quantity,
                available: item.available_quantity,
            }
            .into());
        }

        item.quantity = quantity;

        self.write(&cart)?;

        Ok(())
    }
}
