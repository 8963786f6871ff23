//! Prices
//!
//! Amounts are carried as minor units (pence/cents). The remote API and the
//! guest storage format speak decimal major units, so conversion happens at
//! those edges only.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, iso};
use thiserror::Error;

/// Errors converting between decimal amounts and minor units.
#[derive(Debug, Error, PartialEq)]
pub enum PriceError {
    /// Amounts may never be negative.
    #[error("amount {0} is negative")]
    Negative(Decimal),

    /// The amount does not fit in minor units.
    #[error("amount {0} is out of range")]
    OutOfRange(Decimal),
}

/// Convert a decimal major-unit amount into minor units, rounding half away from zero.
///
/// # Errors
///
/// - [`PriceError::Negative`]: the amount is below zero after rounding.
/// - [`PriceError::OutOfRange`]: the amount overflows `u64` minor units.
pub fn to_minor_units(amount: Decimal) -> Result<u64, PriceError> {
    let scaled = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(PriceError::OutOfRange(amount))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    if scaled.is_sign_negative() && !scaled.is_zero() {
        return Err(PriceError::Negative(amount));
    }

    scaled.to_u64().ok_or(PriceError::OutOfRange(amount))
}

/// Convert minor units into a two-decimal major-unit amount.
#[must_use]
pub fn from_minor_units(minor: u64) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(minor), 2)
}

/// Format minor units for display in the given currency, e.g. `$90.00`.
#[must_use]
pub fn format_minor_units(minor: u64, currency: &'static iso::Currency) -> String {
    match i64::try_from(minor) {
        Ok(amount) => Money::from_minor(amount, currency).to_string(),
        Err(_) => format!("{} {}", from_minor_units(minor), currency.iso_alpha_code),
    }
}

/// Look up an ISO currency by its alphabetic code (`"USD"`, `"GBP"`, ...).
#[must_use]
pub fn currency_from_code(code: &str) -> Option<&'static iso::Currency> {
    iso::find(&code.to_ascii_uppercase())
}

/// Serde adapter storing minor-unit amounts as decimal major units.
pub mod major_units {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

    use super::{from_minor_units, to_minor_units};

    /// Serialize minor units as a decimal major-unit amount.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[expect(
        clippy::trivially_copy_pass_by_ref,
        reason = "signature dictated by serde's `with` attribute"
    )]
    pub fn serialize<S: Serializer>(minor: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&from_minor_units(*minor), serializer)
    }

    /// Deserialize a decimal major-unit amount (string or number) into minor units.
    ///
    /// # Errors
    ///
    /// Fails on malformed, negative or out-of-range amounts.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let amount = <Decimal as Deserialize<'de>>::deserialize(deserializer)?;

        to_minor_units(amount).map_err(D::Error::custom)
    }
}
