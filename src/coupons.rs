//! Coupons
//!
//! A coupon is only ever as good as the server's last verdict for the cart it
//! was computed against. The verdict is mirrored to local storage so it
//! survives reloads, and dropped whenever it may no longer hold.

use std::{str::FromStr, sync::Arc};

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::{
    api::{ApplyCouponRequest, CartApi, CouponTarget},
    errors::CartError,
    items::CartLineItem,
    prices::{from_minor_units, to_minor_units},
    session::Session,
    storage::{
        COUPON_CODE_KEY, COUPON_DISCOUNT_KEY, COUPON_FINAL_PRICE_KEY, COUPON_OWNER_KEY,
        LocalStorage, StorageError,
    },
};

/// A coupon accepted by the server, amounts in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponState {
    /// Code as entered.
    pub code: String,
    /// Discount granted, in minor units.
    pub discount: u64,
    /// Price payable after the discount, in minor units.
    pub final_price: u64,
}

/// Local-storage mirror of the applied coupon.
///
/// Guest and signed-in carts share one storage, so the mirror records whose
/// cart the coupon was validated for and only hands it back to that session.
#[derive(Debug, Clone)]
pub struct CouponLedger {
    storage: Arc<dyn LocalStorage>,
}

impl CouponLedger {
    /// Ledger over the given storage.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// The coupon stored for `session`'s cart, if all of its keys are present.
    ///
    /// A coupon validated for another cart reads as no coupon.
    ///
    /// # Errors
    ///
    /// Fails when storage cannot be read or holds an unparsable amount.
    pub fn load(&self, session: &Session) -> Result<Option<CouponState>, StorageError> {
        let owner = owner_of(session);

        if self.storage.get(COUPON_OWNER_KEY)?.as_deref() != Some(owner.as_str()) {
            debug!(%owner, "no coupon stored for this cart");

            return Ok(None);
        }

        let Some(code) = self.storage.get(COUPON_CODE_KEY)? else {
            return Ok(None);
        };

        let (Some(discount), Some(final_price)) = (
            self.read_amount(COUPON_DISCOUNT_KEY)?,
            self.read_amount(COUPON_FINAL_PRICE_KEY)?,
        ) else {
            return Ok(None);
        };

        Ok(Some(CouponState {
            code,
            discount,
            final_price,
        }))
    }

    /// Mirror a coupon verdict for `session`'s cart to storage.
    ///
    /// # Errors
    ///
    /// Fails when storage cannot be written.
    pub fn save(&self, session: &Session, coupon: &CouponState) -> Result<(), StorageError> {
        self.storage.set(COUPON_OWNER_KEY, &owner_of(session))?;
        self.storage.set(COUPON_CODE_KEY, &coupon.code)?;
        self.storage.set(
            COUPON_DISCOUNT_KEY,
            &from_minor_units(coupon.discount).to_string(),
        )?;
        self.storage.set(
            COUPON_FINAL_PRICE_KEY,
            &from_minor_units(coupon.final_price).to_string(),
        )
    }

    /// Forget the applied coupon.
    ///
    /// # Errors
    ///
    /// Fails when storage cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(COUPON_OWNER_KEY)?;
        self.storage.remove(COUPON_CODE_KEY)?;
        self.storage.remove(COUPON_DISCOUNT_KEY)?;
        self.storage.remove(COUPON_FINAL_PRICE_KEY)
    }

    fn read_amount(&self, key: &str) -> Result<Option<u64>, StorageError> {
        let Some(raw) = self.storage.get(key)? else {
            return Ok(None);
        };

        Decimal::from_str(raw.trim())
            .ok()
            .and_then(|amount| to_minor_units(amount).ok())
            .map(Some)
            .ok_or_else(|| StorageError::InvalidValue {
                key: key.to_string(),
                value: raw,
            })
    }
}

fn owner_of(session: &Session) -> String {
    match session.credentials() {
        Some(credentials) => format!("user:{}", credentials.user_id),
        None => "guest".to_string(),
    }
}

/// Validates coupon codes with the server and keeps the ledger in step.
#[derive(Clone)]
pub struct CouponReconciler {
    api: Arc<dyn CartApi>,
    ledger: CouponLedger,
}

impl std::fmt::Debug for CouponReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponReconciler")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl CouponReconciler {
    /// Reconciler over the given API and ledger.
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>, ledger: CouponLedger) -> Self {
        Self { api, ledger }
    }

    /// The ledger this reconciler writes to.
    #[must_use]
    pub fn ledger(&self) -> &CouponLedger {
        &self.ledger
    }

    /// Validate `code` against the current cart.
    ///
    /// Guests send their full cart; authenticated users send only their id and
    /// the server looks up its own copy. The code is sent verbatim.
    ///
    /// # Errors
    ///
    /// Any failure clears the stored coupon before it is returned, so a
    /// refused code never leaves an earlier discount in place. The server's
    /// reason is returned even if clearing storage fails.
    pub async fn apply_coupon(
        &self,
        code: &str,
        items: &[CartLineItem],
        session: &Session,
    ) -> Result<CouponState, CartError> {
        let request = match session {
            Session::Guest => ApplyCouponRequest {
                code: code.to_string(),
                target: CouponTarget::Cart(items.to_vec()),
                token: None,
            },
            Session::Authenticated(credentials) => ApplyCouponRequest {
                code: code.to_string(),
                target: CouponTarget::User(credentials.user_id),
                token: Some(credentials.token.clone()),
            },
        };

        match self.api.apply_coupon(request).await {
            Ok(quote) => {
                let coupon = CouponState {
                    code: code.to_string(),
                    discount: quote.discount,
                    final_price: quote.final_price,
                };

                self.ledger.save(session, &coupon)?;

                info!(
                    code,
                    discount = coupon.discount,
                    final_price = coupon.final_price,
                    "coupon applied"
                );

                Ok(coupon)
            }
            Err(error) => {
                if let Err(storage) = self.ledger.clear() {
                    error!(error = %storage, "failed to clear refused coupon");
                }

                warn!(code, %error, "coupon not applied");

                Err(error)
            }
        }
    }
}
