//! Remote cart API
//!
//! The contract of the storefront's REST API as far as the cart is concerned.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    errors::CartError,
    ids::{LineItemId, UserId, VariantId},
    items::CartLineItem,
    session::{BearerToken, Credentials},
};

mod http;
mod wire;

pub use http::{ApiConfig, HttpCartApi};

/// What a coupon is validated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponTarget {
    /// The server looks up the user's own cart.
    User(UserId),

    /// A guest cart, sent in full.
    Cart(Vec<CartLineItem>),
}

/// Coupon validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyCouponRequest {
    /// Code as entered.
    pub code: String,
    /// What the code is validated against.
    pub target: CouponTarget,
    /// Sent when present; guests validate anonymously.
    pub token: Option<BearerToken>,
}

/// Server verdict for an accepted coupon, in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponQuote {
    /// Discount granted, in minor units.
    pub discount: u64,
    /// Price payable after the discount, in minor units.
    pub final_price: u64,
    /// Optional note from the server.
    pub message: Option<String>,
}

/// Endpoints backing the server cart and coupon validation.
#[automock]
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Retrieve the user's server-side cart.
    async fn fetch_cart(&self, credentials: &Credentials) -> Result<Vec<CartLineItem>, CartError>;

    /// Add `quantity` of a variant to the user's cart.
    async fn add_item(
        &self,
        credentials: &Credentials,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError>;

    /// Remove a cart line by id.
    async fn remove_item(
        &self,
        credentials: &Credentials,
        item_id: LineItemId,
    ) -> Result<(), CartError>;

    /// Set the quantity of a cart line.
    async fn update_quantity(
        &self,
        credentials: &Credentials,
        item_id: LineItemId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError>;

    /// Validate a coupon code against a cart.
    async fn apply_coupon(&self, request: ApplyCouponRequest) -> Result<CouponQuote, CartError>;
}
