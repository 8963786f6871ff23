//! Cartsync
//!
//! Cartsync is a client-side shopping cart store: guest carts live in local storage,
//! signed-in carts on the server, and coupons are reconciled against whichever is active.

pub mod api;
pub mod coupons;
pub mod errors;
pub mod ids;
pub mod items;
pub mod persistence;
pub mod prices;
pub mod prelude;
pub mod pricing;
pub mod session;
pub mod storage;
pub mod store;
