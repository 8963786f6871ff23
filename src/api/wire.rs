//! Wire formats

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    errors::CartError,
    ids::{LineItemId, VariantId},
    items::CartLineItem,
    prices::to_minor_units,
};

use super::{ApiConfig, CouponQuote};

#[derive(Debug, Deserialize)]
pub(super) struct CartResponse {
    #[serde(default)]
    cart: Vec<CartRow>,
}

#[derive(Debug, Deserialize)]
struct CartRow {
    id: LineItemId,
    quantity: u32,
    variant: VariantBody,
}

#[derive(Debug, Deserialize)]
struct VariantBody {
    id: VariantId,
    price: Decimal,
    /// Units in stock.
    #[serde(default)]
    quantity: u32,
    color: Option<Named>,
    size: Option<Named>,
    product: ProductBody,
}

#[derive(Debug, Deserialize)]
struct ProductBody {
    #[serde(default)]
    name: String,
    brand: Option<Named>,
    #[serde(default)]
    images: Vec<ImageBody>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ImageBody {
    image: String,
}

impl CartResponse {
    pub(super) fn into_line_items(self, config: &ApiConfig) -> Result<Vec<CartLineItem>, CartError> {
        self.cart
            .into_iter()
            .map(|row| {
                let CartRow {
                    id,
                    quantity,
                    variant,
                } = row;

                let image = variant.product.images.first().map(|image| image.image.as_str());

                Ok(CartLineItem {
                    id,
                    variant_id: variant.id,
                    image_url: config.resolve_image_url(image),
                    product_name: variant.product.name,
                    brand_name: name_of(variant.product.brand),
                    color_name: name_of(variant.color),
                    size_name: name_of(variant.size),
                    unit_price: to_minor_units(variant.price)?,
                    quantity,
                    available_quantity: variant.quantity,
                })
            })
            .collect()
    }
}

fn name_of(named: Option<Named>) -> String {
    named.map(|named| named.name).unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub(super) struct AddItemBody {
    pub(super) user_id: u64,
    pub(super) variant_id: u64,
    pub(super) quantity: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct UpdateQuantityBody {
    pub(super) cart_item_id: u64,
    pub(super) variant_id: u64,
    pub(super) quantity: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct ApplyCouponBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) cart: Option<&'a [CartLineItem]>,
    pub(super) coupon: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct CouponResponse {
    discount: Decimal,
    final_price: Decimal,
    message: Option<String>,
}

impl CouponResponse {
    pub(super) fn into_quote(self) -> Result<CouponQuote, CartError> {
        Ok(CouponQuote {
            discount: to_minor_units(self.discount)?,
            final_price: to_minor_units(self.final_price)?,
            message: self.message,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// The human-readable reason carried by an error response body.
pub(super) fn rejection_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with status {status}"))
}
