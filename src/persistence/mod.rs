//! Cart persistence
//!
//! Where a cart lives depends on who is shopping: guests keep theirs in local
//! storage, authenticated users on the server. Both sit behind
//! [`CartPersistence`] and are chosen per operation from the [`Session`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    api::CartApi,
    errors::CartError,
    ids::{LineItemId, VariantId},
    items::{CartLineItem, ProductContext},
    session::Session,
    storage::LocalStorage,
};

mod guest;
mod remote;

pub use guest::{GuestCart, GuestCartStore};
pub use remote::RemoteCartStore;

/// Uniform read/write access to a cart.
#[async_trait]
pub trait CartPersistence: Send + Sync {
    /// Every line currently in the cart.
    async fn load_cart(&self) -> Result<Vec<CartLineItem>, CartError>;

    /// Add `quantity` of a variant, merging with an existing line for it.
    async fn add_item(
        &self,
        product: &ProductContext,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError>;

    /// Remove one line.
    async fn remove_item(&self, item_id: LineItemId) -> Result<(), CartError>;

    /// Set the quantity of one line. Quantities below 1 are refused.
    async fn update_quantity(
        &self,
        item_id: LineItemId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError>;
}

/// The backend serving `session`.
#[must_use]
pub fn for_session<'a>(
    session: &'a Session,
    api: &'a Arc<dyn CartApi>,
    storage: &'a Arc<dyn LocalStorage>,
) -> Box<dyn CartPersistence + 'a> {
    match session {
        Session::Guest => Box::new(GuestCartStore::new(Arc::clone(storage))),
        Session::Authenticated(credentials) => {
            Box::new(RemoteCartStore::new(api.as_ref(), credentials))
        }
    }
}
