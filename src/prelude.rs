//! Cartsync prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    api::{ApiConfig, CartApi, HttpCartApi},
    coupons::{CouponLedger, CouponState},
    errors::{CartError, CartErrorKind, ValidationError},
    ids::{LineItemId, UserId, VariantId},
    items::{CartLineItem, ProductContext},
    pricing::{CartTotals, get_totals},
    session::{BearerToken, Credentials, Session},
    storage::{FileStorage, LocalStorage, MemoryStorage},
    store::{CartSnapshot, CartStore, CouponPolicy, Debounced, LoadState, StoreConfig},
};
