//! Items

use serde::{Deserialize, Serialize};

use crate::{
    ids::{LineItemId, VariantId},
    prices,
};

/// One row of a cart: a single product variant and its quantity.
///
/// Display names are resolved when the cart is fetched and are never used for
/// pricing. `unit_price` is the snapshot taken when the line was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Line item id
    pub id: LineItemId,
    /// Variant held by this line
    pub variant_id: VariantId,
    /// Product name
    #[serde(default)]
    pub product_name: String,
    /// Brand name
    #[serde(default)]
    pub brand_name: String,
    /// Color name
    #[serde(default)]
    pub color_name: String,
    /// Size name
    #[serde(default)]
    pub size_name: String,
    /// Unit price in minor units.
    #[serde(with = "prices::major_units")]
    pub unit_price: u64,
    /// Units in the cart
    pub quantity: u32,
    /// Units in stock
    pub available_quantity: u32,
    /// Absolute image URL
    #[serde(default)]
    pub image_url: String,
}

impl CartLineItem {
    /// Price of the whole line (`unit_price * quantity`), or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<u64> {
        self.unit_price.checked_mul(u64::from(self.quantity))
    }
}

/// What the caller knows about a variant when adding it to the cart.
///
/// Guest carts copy this into the stored line; server carts resolve their own
/// copy and only use `available_quantity` for the client-side stock check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductContext {
    /// Product name
    pub product_name: String,
    /// Brand name
    pub brand_name: String,
    /// Color name
    pub color_name: String,
    /// Size name
    pub size_name: String,
    /// Unit price in minor units.
    pub unit_price: u64,
    /// Units in stock
    pub available_quantity: u32,
    /// Absolute image URL
    pub image_url: String,
}

impl ProductContext {
    /// Build the line stored for a guest cart.
    pub(crate) fn to_line_item(
        &self,
        id: LineItemId,
        variant_id: VariantId,
        quantity: u32,
    ) -> CartLineItem {
        CartLineItem {
            id,
            variant_id,
            product_name: self.product_name.clone(),
            brand_name: self.brand_name.clone(),
            color_name: self.color_name.clone(),
            size_name: self.size_name.clone(),
            unit_price: self.unit_price,
            quantity,
            available_quantity: self.available_quantity,
            image_url: self.image_url.clone(),
        }
    }
}

impl From<&CartLineItem> for ProductContext {
    fn from(item: &CartLineItem) -> Self {
        Self {
            product_name: item.product_name.clone(),
            brand_name: item.brand_name.clone(),
            color_name: item.color_name.clone(),
            size_name: item.size_name.clone(),
            unit_price: item.unit_price,
            available_quantity: item.available_quantity,
            image_url: item.image_url.clone(),
        }
    }
}

/// Total number of units across all lines.
#[must_use]
pub fn item_count(items: &[CartLineItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity)).sum()
}
