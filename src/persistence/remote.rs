//! Server cart backed by the remote API.

use async_trait::async_trait;

use crate::{
    api::CartApi,
    errors::{CartError, ValidationError},
    ids::{LineItemId, VariantId},
    items::{CartLineItem, ProductContext},
    session::Credentials,
};

use super::CartPersistence;

/// Server cart of one authenticated user.
pub struct RemoteCartStore<'a> {
    api: &'a dyn CartApi,
    credentials: &'a Credentials,
}

impl std::fmt::Debug for RemoteCartStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCartStore")
            .field("credentials", self.credentials)
            .finish_non_exhaustive()
    }
}

impl<'a> RemoteCartStore<'a> {
    /// Server cart for `credentials`.
    #[must_use]
    pub fn new(api: &'a dyn CartApi, credentials: &'a Credentials) -> Self {
        Self { api, credentials }
    }
}

#[async_trait]
impl CartPersistence for RemoteCartStore<'_> {
    async fn load_cart(&self) -> Result<Vec<CartLineItem>, CartError> {
        self.api.fetch_cart(self.credentials).await
    }

    async fn add_item(
        &self,
        _product: &ProductContext,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(ValidationError::QuantityBelowMinimum {
                requested: quantity,
            }
            .into());
        }

        self.api
            .add_item(self.credentials, variant_id, quantity)
            .await
    }

    async fn remove_item(&self, item_id: LineItemId) -> Result<(), CartError> {
        self.api.remove_item(self.credentials, item_id).await
    }

    async fn update_quantity(
        &self,
        item_id: LineItemId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(ValidationError::QuantityBelowMinimum {
                requested: quantity,
            }
            .into());
        }

        self.api
            .update_quantity(self.credentials, item_id, variant_id, quantity)
            .await
    }
}
