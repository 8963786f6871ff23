//! Cart snapshots

use jiff::Timestamp;

use crate::{
    coupons::CouponState,
    errors::CartErrorKind,
    ids::{LineItemId, VariantId},
    items::CartLineItem,
    pricing::CartTotals,
};

/// Where the store is in its load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing loaded yet.
    #[default]
    Idle,

    /// A load or mutation is in flight.
    Loading,

    /// The items reflect the backend as of `at`.
    Loaded {
        /// When the load finished.
        at: Timestamp,
    },

    /// The last load or write failed; items are the last known good ones.
    Failed {
        /// Category of the failure.
        kind: CartErrorKind,
        /// Message fit for display.
        message: String,
    },
}

/// Everything a cart-displaying view needs, as of one moment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartSnapshot {
    /// Lines in backend order.
    pub items: Vec<CartLineItem>,
    /// Applied coupon, if any.
    pub coupon: Option<CouponState>,
    /// Derived from `items` and `coupon`.
    pub totals: CartTotals,
    /// Total units across all lines.
    pub count: u64,
    /// Load cycle state.
    pub state: LoadState,
}

impl CartSnapshot {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Line with the given id.
    #[must_use]
    pub fn item(&self, item_id: LineItemId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Line holding the given variant.
    #[must_use]
    pub fn item_for_variant(&self, variant_id: VariantId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.variant_id == variant_id)
    }

    /// Whether a load or mutation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }
}
