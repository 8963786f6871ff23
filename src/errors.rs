//! Cart errors.

use thiserror::Error;

use crate::{ids::LineItemId, prices::PriceError, storage::StorageError};

/// Machine-checkable category of a [`CartError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartErrorKind {
    /// The cart service could not be reached.
    Transport,
    /// The cart service answered with a non-success status.
    Rejected,
    /// The request was refused before reaching persistence.
    Validation,
    /// The coupon was not accepted.
    Coupon,
    /// Local storage failed.
    Storage,
    /// The cart service answered with something unreadable.
    Decode,
}

/// Input refused before any write happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("quantity must be at least 1 (got {requested})")]
    QuantityBelowMinimum { requested: u32 },

    #[error("only {available} in stock (requested {requested})")]
    QuantityExceedsStock { requested: u32, available: u32 },

    #[error("cart item {item_id} not found")]
    ItemNotFound { item_id: LineItemId },

    #[error("cart total is too large")]
    AmountOverflow,

    #[error("you need to be signed in to do that")]
    SessionRequired,
}

/// Failure of any cart operation. The `Display` output is ready to show to a shopper.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("could not reach the cart service")]
    Transport(#[source] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    CouponRejected { message: String },

    #[error("local storage error")]
    Storage(#[from] StorageError),

    #[error("unexpected response from the cart service: {0}")]
    Decode(String),
}

impl CartError {
    /// Category of this error.
    #[must_use]
    pub fn kind(&self) -> CartErrorKind {
        match self {
            Self::Transport(_) => CartErrorKind::Transport,
            Self::Rejected { .. } => CartErrorKind::Rejected,
            Self::Validation(_) => CartErrorKind::Validation,
            Self::CouponRejected { .. } => CartErrorKind::Coupon,
            Self::Storage(_) => CartErrorKind::Storage,
            Self::Decode(_) => CartErrorKind::Decode,
        }
    }
}

impl From<reqwest::Error> for CartError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::Decode(error.to_string());
        }

        Self::Transport(error)
    }
}

impl From<PriceError> for CartError {
    fn from(error: PriceError) -> Self {
        Self::Decode(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_carry_a_readable_reason() {
        let error = CartError::from(ValidationError::QuantityExceedsStock {
            requested: 6,
            available: 5,
        });

        assert_eq!(error.kind(), CartErrorKind::Validation);
        assert_eq!(error.to_string(), "only 5 in stock (requested 6)");
    }

    #[test]
    fn server_messages_are_shown_verbatim() {
        let error = CartError::CouponRejected {
            message: "Coupon expired".to_string(),
        };

        assert_eq!(error.kind(), CartErrorKind::Coupon);
        assert_eq!(error.to_string(), "Coupon expired");
    }

    #[test]
    fn price_errors_are_decode_failures() {
        let error = CartError::from(PriceError::OutOfRange(rust_decimal::Decimal::MAX));

        assert_eq!(error.kind(), CartErrorKind::Decode);
    }
}
