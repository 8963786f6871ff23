//! Cart state store
//!
//! The one object cart-displaying views bind to. Every mutation writes to the
//! backend chosen by the session, then reloads the cart from that backend and
//! recomputes totals before returning; nothing is patched optimistically.
//! Mutations are serialized, so they land in the order they were submitted.

use std::{fmt, sync::Arc, time::Duration};

use jiff::Timestamp;
use rusty_money::iso::{self, Currency};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::{
    api::CartApi,
    coupons::{CouponLedger, CouponReconciler},
    errors::{CartError, ValidationError},
    ids::{LineItemId, VariantId},
    items::{CartLineItem, ProductContext, item_count},
    persistence::{self, CartPersistence, GuestCartStore, RemoteCartStore},
    prices::format_minor_units,
    pricing::{CartTotals, get_totals},
    session::Session,
    storage::LocalStorage,
};

mod debounce;
mod snapshot;

pub use snapshot::{CartSnapshot, LoadState};

use debounce::Debouncer;

/// Default quiet period before a quantity stepper change is written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// What happens to an applied coupon when a line's quantity changes.
///
/// Adding or removing lines always drops the coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CouponPolicy {
    /// Drop the coupon; it was computed for different quantities.
    #[default]
    Invalidate,

    /// Keep the coupon as long as the same lines are present.
    Retain,
}

/// Store settings.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Currency used to format amounts for display.
    pub currency: &'static Currency,

    /// Coupon handling on quantity changes.
    pub coupon_policy: CouponPolicy,

    /// Quiet period for [`CartStore::update_quantity_debounced`].
    pub debounce: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            currency: iso::USD,
            coupon_policy: CouponPolicy::default(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Outcome of a debounced quantity update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Debounced {
    /// This request was the newest one and has been written.
    Applied(CartSnapshot),

    /// A newer request for the same line arrived first; nothing was written.
    Superseded,
}

/// Materialized cart shared by every view of it.
pub struct CartStore {
    config: StoreConfig,
    api: Arc<dyn CartApi>,
    storage: Arc<dyn LocalStorage>,
    coupons: CouponReconciler,
    mutations: Mutex<()>,
    state: watch::Sender<CartSnapshot>,
    debouncer: Debouncer,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("config", &self.config)
            .field("storage", &self.storage)
            .field("snapshot", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// A store over the given API and local storage. Starts idle and empty.
    #[must_use]
    pub fn new(
        config: StoreConfig,
        api: Arc<dyn CartApi>,
        storage: Arc<dyn LocalStorage>,
    ) -> Self {
        let coupons = CouponReconciler::new(
            Arc::clone(&api),
            CouponLedger::new(Arc::clone(&storage)),
        );

        let (state, _) = watch::channel(CartSnapshot::default());

        Self {
            config,
            api,
            storage,
            coupons,
            mutations: Mutex::new(()),
            state,
            debouncer: Debouncer::default(),
        }
    }

    /// Store settings.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The current cart.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.state.borrow().clone()
    }

    /// Totals of the current cart.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.state.borrow().totals
    }

    /// Receive every snapshot the store publishes from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.state.subscribe()
    }

    /// Format minor units in the store's currency.
    #[must_use]
    pub fn format_amount(&self, minor: u64) -> String {
        format_minor_units(minor, self.config.currency)
    }

    /// Reload the cart from the session's backend.
    ///
    /// # Errors
    ///
    /// On failure the previous items are kept and the state becomes
    /// [`LoadState::Failed`].
    #[instrument(name = "cart.reload", skip_all, fields(authenticated = session.is_authenticated()), err)]
    pub async fn reload(&self, session: &Session) -> Result<CartSnapshot, CartError> {
        let _guard = self.mutations.lock().await;

        self.refresh(session).await
    }

    /// Add `quantity` of a variant to the cart.
    ///
    /// The resulting line quantity must not exceed `product.available_quantity`;
    /// it is checked against the stored cart, not the last snapshot. Any applied
    /// coupon is dropped.
    ///
    /// # Errors
    ///
    /// Fails on invalid quantities, or when the write or the reload fails.
    #[instrument(
        name = "cart.add_item",
        skip_all,
        fields(variant_id = %variant_id, quantity),
        err
    )]
    pub async fn add_item(
        &self,
        session: &Session,
        product: &ProductContext,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<CartSnapshot, CartError> {
        let _guard = self.mutations.lock().await;

        check_minimum(quantity)?;

        let previous = self.mark_loading();

        let written = async {
            let backend = self.backend(session);

            check_add_stock(&backend.load_cart().await?, product, variant_id, quantity)?;

            backend.add_item(product, variant_id, quantity).await?;
            self.coupons.ledger().clear()?;

            Ok::<_, CartError>(())
        }
        .await;

        if let Err(error) = written {
            return Err(self.abandon_write(previous, error));
        }

        info!(%variant_id, quantity, "added item to cart");

        self.refresh(session).await
    }

    /// Remove one line. Any applied coupon is dropped.
    ///
    /// # Errors
    ///
    /// Fails when the write or the reload fails.
    #[instrument(name = "cart.remove_item", skip_all, fields(item_id = %item_id), err)]
    pub async fn remove_item(
        &self,
        session: &Session,
        item_id: LineItemId,
    ) -> Result<CartSnapshot, CartError> {
        let _guard = self.mutations.lock().await;

        let previous = self.mark_loading();

        let written = async {
            self.backend(session).remove_item(item_id).await?;
            self.coupons.ledger().clear()?;

            Ok::<_, CartError>(())
        }
        .await;

        if let Err(error) = written {
            return Err(self.abandon_write(previous, error));
        }

        info!(%item_id, "removed item from cart");

        self.refresh(session).await
    }

    /// Set the quantity of one line.
    ///
    /// Quantities below 1, or above the stored line's stock, are refused before
    /// anything is written. The coupon is handled per [`CouponPolicy`].
    ///
    /// # Errors
    ///
    /// Fails on invalid quantities, or when the write or the reload fails.
    #[instrument(
        name = "cart.update_quantity",
        skip_all,
        fields(item_id = %item_id, quantity),
        err
    )]
    pub async fn update_quantity(
        &self,
        session: &Session,
        item_id: LineItemId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<CartSnapshot, CartError> {
        let _guard = self.mutations.lock().await;

        check_minimum(quantity)?;

        let previous = self.mark_loading();

        let written = async {
            let backend = self.backend(session);

            check_update_stock(&backend.load_cart().await?, item_id, quantity)?;

            backend.update_quantity(item_id, variant_id, quantity).await?;

            if self.config.coupon_policy == CouponPolicy::Invalidate {
                self.coupons.ledger().clear()?;
            }

            Ok::<_, CartError>(())
        }
        .await;

        if let Err(error) = written {
            return Err(self.abandon_write(previous, error));
        }

        info!(%item_id, quantity, "updated cart quantity");

        self.refresh(session).await
    }

    /// [`update_quantity`](Self::update_quantity) for rapidly repeated input.
    ///
    /// Waits out the configured quiet period; if another request for the same
    /// line arrived meanwhile, this one is dropped and only the newest is written.
    ///
    /// # Errors
    ///
    /// As [`update_quantity`](Self::update_quantity), for the request that is written.
    pub async fn update_quantity_debounced(
        &self,
        session: &Session,
        item_id: LineItemId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<Debounced, CartError> {
        let generation = self.debouncer.begin(item_id);

        tokio::time::sleep(self.config.debounce).await;

        if !self.debouncer.is_current(item_id, generation) {
            debug!(%item_id, quantity, "quantity update superseded");

            return Ok(Debounced::Superseded);
        }

        let result = self
            .update_quantity(session, item_id, variant_id, quantity)
            .await;

        self.debouncer.finish(item_id, generation);

        result.map(Debounced::Applied)
    }

    /// Validate `code` against the current cart and apply the server's verdict.
    ///
    /// # Errors
    ///
    /// A refused code clears any earlier coupon, leaving totals at the plain
    /// subtotal, and the server's reason is returned.
    #[instrument(name = "cart.apply_coupon", skip_all, err)]
    pub async fn apply_coupon(
        &self,
        session: &Session,
        code: &str,
    ) -> Result<CartSnapshot, CartError> {
        let _guard = self.mutations.lock().await;

        let previous = self.mark_loading();

        let items = match self.backend(session).load_cart().await {
            Ok(items) => items,
            Err(error) => return Err(self.abandon_write(previous, error)),
        };

        if let Err(error) = self.coupons.apply_coupon(code, &items, session).await {
            let totals = get_totals(&items, None)?;

            self.state.send_replace(CartSnapshot {
                count: item_count(&items),
                items,
                coupon: None,
                totals,
                state: LoadState::Loaded { at: Timestamp::now() },
            });

            return Err(error);
        }

        self.refresh(session).await
    }

    /// Reset the in-memory cart to empty, e.g. after checkout.
    ///
    /// With `purge_storage` the guest cart and coupon keys are deleted too.
    ///
    /// # Errors
    ///
    /// Fails when purging storage fails; the in-memory cart is reset regardless.
    pub async fn clear(&self, purge_storage: bool) -> Result<CartSnapshot, CartError> {
        let _guard = self.mutations.lock().await;

        self.state.send_replace(CartSnapshot::default());
        self.debouncer.reset();

        if purge_storage {
            GuestCartStore::new(Arc::clone(&self.storage)).purge()?;
            self.coupons.ledger().clear()?;
        }

        info!(purge_storage, "cleared cart");

        Ok(CartSnapshot::default())
    }

    /// Move the guest cart into the signed-in user's server cart.
    ///
    /// Never runs implicitly: signing in alone leaves the guest cart untouched
    /// and unseen. Each guest line is checked against the server cart's stock,
    /// added to the server cart and then dropped from the guest cart, so a retry
    /// after a failure resumes with the lines not yet moved. Finally any coupon
    /// is dropped and the server cart is loaded.
    ///
    /// # Errors
    ///
    /// Fails for guest sessions, when a merged line would exceed its stock, or
    /// when a server write fails.
    #[instrument(name = "cart.adopt_guest_cart", skip_all, err)]
    pub async fn adopt_guest_cart(&self, session: &Session) -> Result<CartSnapshot, CartError> {
        let Session::Authenticated(credentials) = session else {
            return Err(ValidationError::SessionRequired.into());
        };

        let _guard = self.mutations.lock().await;

        let guest = GuestCartStore::new(Arc::clone(&self.storage));
        let lines = guest.read()?.cart_items;

        if lines.is_empty() {
            return self.refresh(session).await;
        }

        let previous = self.mark_loading();
        let remote = RemoteCartStore::new(self.api.as_ref(), credentials);

        let written = async {
            let server_lines = remote.load_cart().await?;

            for line in &lines {
                let product = ProductContext::from(line);

                check_add_stock(&server_lines, &product, line.variant_id, line.quantity)?;

                remote
                    .add_item(&product, line.variant_id, line.quantity)
                    .await?;
                guest.remove_item(line.id).await?;

                debug!(item_id = %line.id, variant_id = %line.variant_id, "moved guest line");
            }

            guest.purge()?;
            self.coupons.ledger().clear()?;

            Ok::<_, CartError>(())
        }
        .await;

        if let Err(error) = written {
            return Err(self.abandon_write(previous, error));
        }

        info!(lines = lines.len(), "adopted guest cart");

        self.refresh(session).await
    }

    fn backend<'a>(&'a self, session: &'a Session) -> Box<dyn CartPersistence + 'a> {
        persistence::for_session(session, &self.api, &self.storage)
    }

    /// Enter [`LoadState::Loading`], returning the state to fall back to.
    fn mark_loading(&self) -> LoadState {
        let mut previous = LoadState::Loading;

        self.state.send_modify(|snapshot| {
            previous = std::mem::replace(&mut snapshot.state, LoadState::Loading);
        });

        previous
    }

    /// A write failed: the cart is unchanged, so fall back to the prior state.
    fn abandon_write(&self, previous: LoadState, error: CartError) -> CartError {
        warn!(%error, kind = ?error.kind(), "cart write failed");

        self.state.send_modify(|snapshot| snapshot.state = previous);

        error
    }

    async fn refresh(&self, session: &Session) -> Result<CartSnapshot, CartError> {
        self.mark_loading();

        match self.materialize(session).await {
            Ok(snapshot) => {
                debug!(
                    lines = snapshot.items.len(),
                    count = snapshot.count,
                    subtotal = snapshot.totals.subtotal,
                    total = snapshot.totals.total,
                    "cart loaded"
                );

                self.state.send_replace(snapshot.clone());

                Ok(snapshot)
            }
            Err(error) => {
                warn!(%error, kind = ?error.kind(), "cart load failed, keeping last known items");

                self.state.send_modify(|snapshot| {
                    snapshot.state = LoadState::Failed {
                        kind: error.kind(),
                        message: error.to_string(),
                    };
                });

                Err(error)
            }
        }
    }

    async fn materialize(&self, session: &Session) -> Result<CartSnapshot, CartError> {
        let items = self.backend(session).load_cart().await?;
        let coupon = self.coupons.ledger().load(session)?;
        let totals = get_totals(&items, coupon.as_ref())?;

        Ok(CartSnapshot {
            count: item_count(&items),
            items,
            coupon,
            totals,
            state: LoadState::Loaded {
                at: Timestamp::now(),
            },
        })
    }
}

fn check_minimum(quantity: u32) -> Result<(), ValidationError> {
    if quantity < 1 {
        return Err(ValidationError::QuantityBelowMinimum {
            requested: quantity,
        });
    }

    Ok(())
}

/// `quantity` more of `variant_id` on top of what `lines` already hold must be in stock.
fn check_add_stock(
    lines: &[CartLineItem],
    product: &ProductContext,
    variant_id: VariantId,
    quantity: u32,
) -> Result<(), ValidationError> {
    let in_cart = lines
        .iter()
        .find(|item| item.variant_id == variant_id)
        .map_or(0, |item| item.quantity);

    let requested = in_cart.saturating_add(quantity);

    if requested > product.available_quantity {
        return Err(ValidationError::QuantityExceedsStock {
            requested,
            available: product.available_quantity,
        });
    }

    Ok(())
}

fn check_update_stock(
    lines: &[CartLineItem],
    item_id: LineItemId,
    quantity: u32,
) -> Result<(), ValidationError> {
    let item = lines
        .iter()
        .find(|item| item.id == item_id)
        .ok_or(ValidationError::ItemNotFound { item_id })?;

    if quantity > item.available_quantity {
        return Err(ValidationError::QuantityExceedsStock {
            requested: quantity,
            available: item.available_quantity,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use testresult::TestResult;

    use crate::{
        api::{CouponQuote, MockCartApi},
        coupons::CouponState,
        errors::CartErrorKind,
        ids::UserId,
        items::CartLineItem,
        session::BearerToken,
        storage::MemoryStorage,
    };

    use super::*;

    fn sneaker(unit_price: u64, available_quantity: u32) -> ProductContext {
        ProductContext {
            product_name: "Runner".to_string(),
            unit_price,
            available_quantity,
            ..ProductContext::default()
        }
    }

    fn offline_api() -> MockCartApi {
        let mut api = MockCartApi::new();

        api.expect_fetch_cart().never();
        api.expect_add_item().never();
        api.expect_remove_item().never();
        api.expect_update_quantity().never();
        api.expect_apply_coupon().never();

        api
    }

    fn guest_store(api: MockCartApi, storage: &MemoryStorage, config: StoreConfig) -> CartStore {
        CartStore::new(config, Arc::new(api), Arc::new(storage.clone()))
    }

    fn member() -> Session {
        Session::authenticated(UserId::new(42), BearerToken::new("tkn"))
    }

    fn seed_coupon(storage: &MemoryStorage) -> TestResult {
        CouponLedger::new(Arc::new(storage.clone())).save(&Session::Guest, &CouponState {
            code: "SAVE10".to_string(),
            discount: 1000,
            final_price: 9000,
        })?;

        Ok(())
    }

    #[tokio::test]
    async fn guest_adds_are_reloaded_with_totals() -> TestResult {
        let storage = MemoryStorage::new();
        let store = guest_store(offline_api(), &storage, StoreConfig::default());

        store
            .add_item(&Session::Guest, &sneaker(2500, 5), VariantId::new(1), 2)
            .await?;
        let snapshot = store
            .add_item(&Session::Guest, &sneaker(1000, 5), VariantId::new(2), 1)
            .await?;

        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.count, 3);
        assert_eq!(
            snapshot.totals,
            CartTotals {
                subtotal: 6000,
                discount: 0,
                total: 6000,
            }
        );
        assert!(
            matches!(snapshot.state, LoadState::Loaded { .. }),
            "expected loaded state, got {:?}",
            snapshot.state
        );
        assert_eq!(store.snapshot(), snapshot);
        assert_eq!(store.format_amount(snapshot.totals.total), "$60.00");

        Ok(())
    }

    #[tokio::test]
    async fn adding_beyond_stock_is_refused_before_writing() -> TestResult {
        let storage = MemoryStorage::new();
        let store = guest_store(offline_api(), &storage, StoreConfig::default());

        store
            .add_item(&Session::Guest, &sneaker(2500, 3), VariantId::new(1), 2)
            .await?;

        let result = store
            .add_item(&Session::Guest, &sneaker(2500, 3), VariantId::new(1), 2)
            .await;

        assert!(
            matches!(
                result,
                Err(CartError::Validation(ValidationError::QuantityExceedsStock {
                    requested: 4,
                    available: 3
                }))
            ),
            "expected stock error, got {result:?}"
        );
        assert_eq!(
            store.reload(&Session::Guest).await?.items.first().map(|i| i.quantity),
            Some(2)
        );

        Ok(())
    }

    #[tokio::test]
    async fn updating_beyond_a_lines_stock_is_refused() -> TestResult {
        let storage = MemoryStorage::new();
        let store = guest_store(offline_api(), &storage, StoreConfig::default());

        let before = store
            .add_item(&Session::Guest, &sneaker(2500, 3), VariantId::new(1), 1)
            .await?;

        let result = store
            .update_quantity(&Session::Guest, LineItemId::new(1), VariantId::new(1), 5)
            .await;

        assert!(
            matches!(
                result,
                Err(CartError::Validation(ValidationError::QuantityExceedsStock {
                    requested: 5,
                    available: 3
                }))
            ),
            "expected stock error, got {result:?}"
        );
        assert_eq!(store.snapshot(), before);

        Ok(())
    }

    #[tokio::test]
    async fn a_fresh_store_checks_stock_against_the_stored_cart() -> TestResult {
        let storage = MemoryStorage::new();

        guest_store(offline_api(), &storage, StoreConfig::default())
            .add_item(&Session::Guest, &sneaker(2500, 5), VariantId::new(1), 5)
            .await?;

        let store = guest_store(offline_api(), &storage, StoreConfig::default());

        assert!(store.snapshot().is_empty(), "new store starts unloaded");

        let added = store
            .add_item(&Session::Guest, &sneaker(2500, 5), VariantId::new(1), 1)
            .await;

        assert!(
            matches!(
                added,
                Err(CartError::Validation(ValidationError::QuantityExceedsStock {
                    requested: 6,
                    available: 5
                }))
            ),
            "expected stock error on add, got {added:?}"
        );

        let updated = store
            .update_quantity(&Session::Guest, LineItemId::new(1), VariantId::new(1), 99)
            .await;

        assert!(
            matches!(
                updated,
                Err(CartError::Validation(ValidationError::QuantityExceedsStock {
                    requested: 99,
                    available: 5
                }))
            ),
            "expected stock error on update, got {updated:?}"
        );

        let unknown = store
            .update_quantity(&Session::Guest, LineItemId::new(8), VariantId::new(1), 1)
            .await;

        assert!(
            matches!(
                unknown,
                Err(CartError::Validation(ValidationError::ItemNotFound { .. }))
            ),
            "expected ItemNotFound, got {unknown:?}"
        );
        assert_eq!(
            store.reload(&Session::Guest).await?.items.first().map(|i| i.quantity),
            Some(5)
        );

        Ok(())
    }

    #[tokio::test]
    async fn signing_in_does_not_carry_a_guest_coupon_over() -> TestResult {
        let storage = MemoryStorage::new();
        let mut api = MockCartApi::new();

        api.expect_apply_coupon().once().return_once(|_| {
            Ok(CouponQuote {
                discount: 1000,
                final_price: 9000,
                message: None,
            })
        });
        api.expect_fetch_cart().once().return_once(|_| {
            Ok(vec![sneaker(50_000, 2).to_line_item(
                LineItemId::new(31),
                VariantId::new(9),
                1,
            )])
        });

        let store = guest_store(api, &storage, StoreConfig::default());

        store
            .add_item(&Session::Guest, &sneaker(10_000, 5), VariantId::new(1), 1)
            .await?;
        store.apply_coupon(&Session::Guest, "SAVE10").await?;

        let signed_in = store.reload(&member()).await?;

        assert_eq!(signed_in.coupon, None);
        assert_eq!(
            signed_in.totals,
            CartTotals {
                subtotal: 50_000,
                discount: 0,
                total: 50_000,
            }
        );

        let guest = store.reload(&Session::Guest).await?;

        assert_eq!(guest.totals.total, 9000, "guest cart keeps its coupon");

        Ok(())
    }

    #[tokio::test]
    async fn quantity_below_one_leaves_the_cart_untouched() -> TestResult {
        let storage = MemoryStorage::new();
        let store = guest_store(offline_api(), &storage, StoreConfig::default());

        let before = store
            .add_item(&Session::Guest, &sneaker(2500, 3), VariantId::new(1), 1)
            .await?;

        let result = store
            .update_quantity(&Session::Guest, LineItemId::new(1), VariantId::new(1), 0)
            .await;

        assert!(
            matches!(&result, Err(error) if error.kind() == CartErrorKind::Validation),
            "expected validation error, got {result:?}"
        );
        assert_eq!(store.snapshot(), before);

        Ok(())
    }

    #[tokio::test]
    async fn adding_or_removing_lines_drops_the_coupon() -> TestResult {
        let storage = MemoryStorage::new();
        let store = guest_store(offline_api(), &storage, StoreConfig::default());

        store
            .add_item(&Session::Guest, &sneaker(5000, 5), VariantId::new(1), 2)
            .await?;

        seed_coupon(&storage)?;

        let reloaded = store.reload(&Session::Guest).await?;

        assert_eq!(reloaded.totals.total, 9000);

        let snapshot = store
            .remove_item(&Session::Guest, LineItemId::new(1))
            .await?;

        assert_eq!(snapshot.coupon, None);
        assert_eq!(snapshot.totals, CartTotals::default());
        assert_eq!(
            CouponLedger::new(Arc::new(storage.clone())).load(&Session::Guest)?,
            None,
            "ledger should be empty"
        );

        Ok(())
    }

    #[tokio::test]
    async fn quantity_changes_follow_the_coupon_policy() -> TestResult {
        for (policy, keeps_coupon) in [(CouponPolicy::Invalidate, false), (CouponPolicy::Retain, true)] {
            let storage = MemoryStorage::new();
            let config = StoreConfig {
                coupon_policy: policy,
                ..StoreConfig::default()
            };
            let store = guest_store(offline_api(), &storage, config);

            store
                .add_item(&Session::Guest, &sneaker(5000, 5), VariantId::new(1), 2)
                .await?;

            seed_coupon(&storage)?;

            let snapshot = store
                .update_quantity(&Session::Guest, LineItemId::new(1), VariantId::new(1), 3)
                .await?;

            assert_eq!(snapshot.coupon.is_some(), keeps_coupon, "policy {policy:?}");
        }

        Ok(())
    }

    #[tokio::test]
    async fn rejected_coupon_reverts_totals_to_the_subtotal() -> TestResult {
        let storage = MemoryStorage::new();
        let mut api = MockCartApi::new();

        api.expect_apply_coupon().once().return_once(|_| {
            Err(CartError::CouponRejected {
                message: "Coupon expired".to_string(),
            })
        });

        let store = guest_store(api, &storage, StoreConfig::default());

        store
            .add_item(&Session::Guest, &sneaker(5000, 5), VariantId::new(1), 2)
            .await?;

        seed_coupon(&storage)?;
        store.reload(&Session::Guest).await?;

        let result = store.apply_coupon(&Session::Guest, "OLD").await;

        assert!(
            matches!(&result, Err(error) if error.to_string() == "Coupon expired"),
            "expected coupon rejection, got {result:?}"
        );

        let snapshot = store.snapshot();

        assert_eq!(snapshot.coupon, None);
        assert_eq!(
            snapshot.totals,
            CartTotals {
                subtotal: 10000,
                discount: 0,
                total: 10000,
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn accepted_coupon_sets_the_final_price() -> TestResult {
        let storage = MemoryStorage::new();
        let mut api = MockCartApi::new();

        api.expect_apply_coupon().once().return_once(|_| {
            Ok(CouponQuote {
                discount: 1000,
                final_price: 9000,
                message: None,
            })
        });

        let store = guest_store(api, &storage, StoreConfig::default());

        store
            .add_item(&Session::Guest, &sneaker(5000, 5), VariantId::new(1), 2)
            .await?;

        let snapshot = store.apply_coupon(&Session::Guest, "SAVE10").await?;

        assert_eq!(
            snapshot.totals,
            CartTotals {
                subtotal: 10000,
                discount: 1000,
                total: 9000,
            }
        );
        assert_eq!(snapshot.coupon.map(|c| c.code), Some("SAVE10".to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn failed_load_keeps_the_last_known_items() -> TestResult {
        let storage = MemoryStorage::new();
        let mut api = MockCartApi::new();
        let mut calls = 0;

        api.expect_fetch_cart().times(2).returning(move |_| {
            calls += 1;

            if calls == 1 {
                Ok(vec![ProductContext {
                    unit_price: 1500,
                    available_quantity: 4,
                    ..ProductContext::default()
                }
                .to_line_item(LineItemId::new(11), VariantId::new(3), 1)])
            } else {
                Err(CartError::Rejected {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            }
        });

        let store = CartStore::new(StoreConfig::default(), Arc::new(api), Arc::new(storage));
        let session = member();

        let loaded = store.reload(&session).await?;
        let result = store.reload(&session).await;

        assert!(result.is_err(), "second reload should fail");

        let snapshot = store.snapshot();

        assert_eq!(snapshot.items, loaded.items);
        assert_eq!(
            snapshot.state,
            LoadState::Failed {
                kind: CartErrorKind::Rejected,
                message: "unavailable".to_string(),
            }
        );

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_quantity_changes_write_only_the_last() -> TestResult {
        let storage = MemoryStorage::new();
        let store = guest_store(offline_api(), &storage, StoreConfig::default());

        store
            .add_item(&Session::Guest, &sneaker(1000, 9), VariantId::new(1), 1)
            .await?;

        let (first, second) = tokio::join!(
            store.update_quantity_debounced(
                &Session::Guest,
                LineItemId::new(1),
                VariantId::new(1),
                2
            ),
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;

                store
                    .update_quantity_debounced(
                        &Session::Guest,
                        LineItemId::new(1),
                        VariantId::new(1),
                        3,
                    )
                    .await
            }
        );

        assert_eq!(first?, Debounced::Superseded);

        let Debounced::Applied(snapshot) = second? else {
            return Err("newest update should be applied".into());
        };

        assert_eq!(snapshot.items.first().map(|i| i.quantity), Some(3));

        Ok(())
    }

    #[tokio::test]
    async fn adopting_requires_a_signed_in_user() {
        let store = guest_store(offline_api(), &MemoryStorage::new(), StoreConfig::default());

        let result = store.adopt_guest_cart(&Session::Guest).await;

        assert!(
            matches!(
                result,
                Err(CartError::Validation(ValidationError::SessionRequired))
            ),
            "expected SessionRequired, got {result:?}"
        );
    }

    #[tokio::test]
    async fn adopting_moves_guest_lines_to_the_server() -> TestResult {
        let storage = MemoryStorage::new();

        {
            let guest = guest_store(offline_api(), &storage, StoreConfig::default());

            guest
                .add_item(&Session::Guest, &sneaker(1000, 9), VariantId::new(1), 2)
                .await?;
            guest
                .add_item(&Session::Guest, &sneaker(2000, 9), VariantId::new(2), 1)
                .await?;
        }

        let mut api = MockCartApi::new();

        api.expect_add_item()
            .times(2)
            .withf(|credentials, _, _| credentials.user_id == UserId::new(42))
            .returning(|_, _, _| Ok(()));
        api.expect_fetch_cart()
            .times(2)
            .returning(|_| Ok(Vec::<CartLineItem>::new()));

        let store = CartStore::new(
            StoreConfig::default(),
            Arc::new(api),
            Arc::new(storage.clone()),
        );

        store.adopt_guest_cart(&member()).await?;

        assert!(
            GuestCartStore::new(Arc::new(storage)).read()?.cart_items.is_empty(),
            "guest cart should be purged"
        );

        Ok(())
    }

    #[tokio::test]
    async fn interrupted_adoption_resumes_without_duplicating_lines() -> TestResult {
        let storage = MemoryStorage::new();

        {
            let guest = guest_store(offline_api(), &storage, StoreConfig::default());

            guest
                .add_item(&Session::Guest, &sneaker(1000, 9), VariantId::new(1), 2)
                .await?;
            guest
                .add_item(&Session::Guest, &sneaker(2000, 9), VariantId::new(2), 1)
                .await?;
        }

        let sent = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = Arc::clone(&sent);
        let mut api = MockCartApi::new();

        api.expect_add_item().times(3).returning(move |_, variant, _| {
            let mut sent = recorded
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);

            sent.push(variant);

            if sent.len() == 2 {
                return Err(CartError::Rejected {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }

            Ok(())
        });
        api.expect_fetch_cart()
            .times(3)
            .returning(|_| Ok(Vec::<CartLineItem>::new()));

        let store = CartStore::new(
            StoreConfig::default(),
            Arc::new(api),
            Arc::new(storage.clone()),
        );

        let first = store.adopt_guest_cart(&member()).await;

        assert!(first.is_err(), "second line should fail");
        assert_eq!(
            GuestCartStore::new(Arc::new(storage.clone()))
                .read()?
                .cart_items
                .iter()
                .map(|i| i.variant_id)
                .collect::<Vec<_>>(),
            vec![VariantId::new(2)],
            "only the unmoved line should remain"
        );

        store.adopt_guest_cart(&member()).await?;

        assert_eq!(
            *sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
            vec![VariantId::new(1), VariantId::new(2), VariantId::new(2)]
        );
        assert!(
            GuestCartStore::new(Arc::new(storage)).read()?.cart_items.is_empty(),
            "guest cart should be purged"
        );

        Ok(())
    }

    #[tokio::test]
    async fn clearing_resets_memory_and_optionally_storage() -> TestResult {
        let storage = MemoryStorage::new();
        let store = guest_store(offline_api(), &storage, StoreConfig::default());

        store
            .add_item(&Session::Guest, &sneaker(1000, 9), VariantId::new(1), 2)
            .await?;

        store.clear(false).await?;

        assert!(store.snapshot().is_empty(), "memory should be empty");
        assert_eq!(store.reload(&Session::Guest).await?.count, 2);

        store.clear(true).await?;

        assert_eq!(store.reload(&Session::Guest).await?.count, 0);

        Ok(())
    }
}
