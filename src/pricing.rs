//! Pricing
//!
//! Cart totals are always derived from line items plus the coupon state; they
//! are never stored on their own.

use crate::{coupons::CouponState, errors::ValidationError, items::CartLineItem};

/// Subtotal, discount and total of a cart, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    /// Sum of all line totals, in minor units.
    pub subtotal: u64,
    /// Coupon discount, in minor units.
    pub discount: u64,
    /// Amount payable, in minor units.
    pub total: u64,
}

/// Sum of `unit_price * quantity` over all lines.
///
/// # Errors
///
/// Returns [`ValidationError::AmountOverflow`] if the sum does not fit in `u64`.
pub fn compute_subtotal(items: &[CartLineItem]) -> Result<u64, ValidationError> {
    items.iter().try_fold(0_u64, |acc, item| {
        item.line_total()
            .and_then(|line| acc.checked_add(line))
            .ok_or(ValidationError::AmountOverflow)
    })
}

/// Totals for `items` under an optional coupon.
///
/// The server's final price is authoritative whenever the coupon carries a
/// positive one; otherwise the coupon is treated as inactive and the total is
/// the subtotal. An empty cart totals zero whatever coupon is held.
///
/// # Errors
///
/// Returns [`ValidationError::AmountOverflow`] if the subtotal overflows.
pub fn get_totals(
    items: &[CartLineItem],
    coupon: Option<&CouponState>,
) -> Result<CartTotals, ValidationError> {
    let subtotal = compute_subtotal(items)?;

    if items.is_empty() {
        return Ok(CartTotals::default());
    }

    Ok(match coupon {
        Some(coupon) if coupon.final_price > 0 => CartTotals {
            subtotal,
            discount: coupon.discount,
            total: coupon.final_price,
        },
        _ => CartTotals {
            subtotal,
            discount: 0,
            total: subtotal,
        },
    })
}
