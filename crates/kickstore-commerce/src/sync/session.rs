//! Identity-aware cart service.

use crate::cart::{check_availability, check_line, AvailabilityReport, Cart, CartOwner};
use crate::catalog::CatalogReader;
use crate::coupon::{AppliedCoupon, Coupon, CouponValidator};
use crate::error::CommerceError;
use crate::events::{ClearReason, CommerceEvent, EventBus};
use crate::ids::{CartItemId, SneakerId, UserId};
use crate::store::CartStore;
use crate::sync::{CartApi, LocalCartStore, MergeOutcome, SyncEngine};
use crate::validation::{CartLineRequest, IntegrityValidator};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Collaborators a [`CartSession`] works with.
#[derive(Clone)]
pub struct SessionDeps {
    pub api: Arc<dyn CartApi>,
    pub catalog: Arc<dyn CatalogReader>,
    pub coupons: Arc<dyn CouponValidator>,
    pub validator: IntegrityValidator,
    pub events: EventBus,
}

/// The cart of whoever is using this device right now.
///
/// Anonymous mutations are applied locally and persisted to the device
/// cache. Authenticated mutations are sent to the server and the store is
/// replaced with the cart the server returns; nothing is applied
/// optimistically, and a failed call leaves the store as it was.
pub struct CartSession {
    owner: RwLock<CartOwner>,
    store: CartStore,
    local: LocalCartStore,
    sync: SyncEngine,
    deps: SessionDeps,
}

impl CartSession {
    /// Start an anonymous session from whatever the device cache holds.
    pub fn restore(local: LocalCartStore, deps: SessionDeps) -> Result<Self, CommerceError> {
        let cart = local.restore(&deps.validator)?;
        tracing::debug!(device = %local.device(), items = cart.items().len(), "restored device cart");
        Ok(Self {
            owner: RwLock::new(CartOwner::Device(local.device().clone())),
            store: CartStore::new(cart),
            local,
            sync: SyncEngine::new(),
            deps,
        })
    }

    pub fn owner(&self) -> CartOwner {
        self.owner.read().clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self.owner() {
            CartOwner::User(user_id) => Some(user_id),
            CartOwner::Device(_) => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.owner.read().is_authenticated()
    }

    /// A copy of the current cart.
    pub fn cart(&self) -> Cart {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.store.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.deps.events
    }

    pub fn catalog(&self) -> &dyn CatalogReader {
        self.deps.catalog.as_ref()
    }

    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    fn emit_updated(&self, cart: &Cart) {
        self.deps.events.emit(CommerceEvent::CartUpdated {
            cart_id: cart.id.clone(),
            item_count: cart.item_count(),
            final_price: cart.final_price(),
        });
    }

    fn apply_local(
        &self,
        mutate: impl FnOnce(&mut Cart) -> Result<bool, CommerceError>,
    ) -> Result<bool, CommerceError> {
        let (changed, cart) = self.store.update(mutate)?;
        if changed {
            self.local.save_cart(&cart)?;
            self.emit_updated(&cart);
        }
        Ok(changed)
    }

    /// Await a server call made on behalf of `user_id` and adopt its cart.
    async fn apply_remote(
        &self,
        user_id: &UserId,
        call: impl Future<Output = Result<Cart, CommerceError>>,
    ) -> Result<Cart, CommerceError> {
        match call.await {
            Ok(cart) => {
                if self.user_id().as_ref() != Some(user_id) {
                    tracing::debug!(user_id = %user_id, "identity changed during cart call, discarding response");
                    return Ok(cart);
                }
                self.store.replace(cart.clone());
                self.emit_updated(&cart);
                Ok(cart)
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "cart call failed, keeping current state");
                self.deps.events.emit(CommerceEvent::SyncFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Re-check one mutated line against live stock and flag it.
    ///
    /// The mutation has already happened; a short line is reported through
    /// [`CommerceEvent::ItemsUnavailable`] and stays in the cart until the
    /// shopper fixes it. Checkout review gates on the full check.
    async fn flag_stock(&self, mut cart: Cart, cart_item_id: Option<CartItemId>) -> Cart {
        let Some(item) = cart_item_id.and_then(|id| cart.get_item(&id).cloned()) else {
            return cart;
        };
        let line = match check_line(&item, self.deps.catalog.as_ref()).await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(cart_item_id = %item.cart_item_id, error = %e, "stock check after mutation failed");
                return cart;
            }
        };

        let report = AvailabilityReport { lines: vec![line] };
        cart.apply_availability(&report);
        let flagged = self.store.update(|current| {
            if current.id != cart.id {
                return Ok(false);
            }
            current.apply_availability(&report);
            Ok(true)
        });
        if let Err(e) = flagged {
            tracing::warn!(cart_id = %cart.id, error = %e, "could not flag line availability");
        }

        if !report.all_available() {
            tracing::info!(
                cart_id = %cart.id,
                cart_item_id = %item.cart_item_id,
                requested = item.quantity,
                "cart line exceeds live stock"
            );
            self.deps.events.emit(CommerceEvent::ItemsUnavailable {
                cart_id: cart.id.clone(),
                items: vec![item.cart_item_id],
            });
        }
        cart
    }

    /// Validate and add a line; a matching line has its quantity increased.
    pub async fn add_item(&self, request: &CartLineRequest) -> Result<Cart, CommerceError> {
        let item = self
            .deps
            .validator
            .validate_with_catalog(request, self.deps.catalog.as_ref())
            .await?;
        let key = item.key();

        let cart = match self.owner() {
            CartOwner::Device(_) => {
                self.apply_local(|cart| cart.add_item(item).map(|_| true))?;
                self.cart()
            }
            CartOwner::User(user_id) => {
                self.apply_remote(&user_id, self.deps.api.add_item(&user_id, &item))
                    .await?
            }
        };
        let line_id = cart.find_by_key(&key).map(|line| line.cart_item_id.clone());
        Ok(self.flag_stock(cart, line_id).await)
    }

    /// Set a line's quantity. Returns false when no line has that id.
    pub async fn update_quantity(
        &self,
        cart_item_id: &CartItemId,
        quantity: i64,
    ) -> Result<bool, CommerceError> {
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let cart = match self.owner() {
            CartOwner::Device(_) => {
                if !self.apply_local(|cart| cart.update_quantity(cart_item_id, quantity))? {
                    return Ok(false);
                }
                self.cart()
            }
            CartOwner::User(user_id) => {
                let updated = self
                    .apply_remote(
                        &user_id,
                        self.deps.api.update_quantity(&user_id, cart_item_id, quantity),
                    )
                    .await;
                match updated {
                    Ok(cart) => cart,
                    Err(CommerceError::ItemNotInCart(_)) => return Ok(false),
                    Err(e) => return Err(e),
                }
            }
        };
        self.flag_stock(cart, Some(cart_item_id.clone())).await;
        Ok(true)
    }

    /// Remove a line. Returns false when no line has that id.
    pub async fn remove_item(&self, cart_item_id: &CartItemId) -> Result<bool, CommerceError> {
        match self.owner() {
            CartOwner::Device(_) => self.apply_local(|cart| cart.remove_item(cart_item_id)),
            CartOwner::User(user_id) => not_found_as_false(
                self.apply_remote(&user_id, self.deps.api.remove_item(&user_id, cart_item_id))
                    .await,
            ),
        }
    }

    /// Empty the cart and drop its coupon.
    pub async fn clear(&self) -> Result<(), CommerceError> {
        let cart_id = match self.owner() {
            CartOwner::Device(_) => {
                let (_, cart) = self.store.update(|cart| cart.clear())?;
                self.local.clear()?;
                cart.id
            }
            CartOwner::User(user_id) => {
                self.apply_remote(&user_id, self.deps.api.clear(&user_id))
                    .await?
                    .id
            }
        };
        self.deps.events.emit(CommerceEvent::CartCleared {
            cart_id,
            reason: ClearReason::Requested,
        });
        Ok(())
    }

    /// Validate a coupon code against the cart total and attach it.
    pub async fn apply_coupon(&self, code: &str) -> Result<Coupon, CommerceError> {
        let total = self.store.with(|cart| cart.total_price());
        let coupon = self.deps.coupons.validate(code, &total).await?;
        let applied = AppliedCoupon::from(&coupon);

        let cart_id = match self.owner() {
            CartOwner::Device(_) => {
                self.apply_local(|cart| cart.apply_coupon(applied).map(|_| true))?;
                self.store.with(|cart| cart.id.clone())
            }
            CartOwner::User(user_id) => {
                self.apply_remote(&user_id, self.deps.api.apply_coupon(&user_id, &applied))
                    .await?
                    .id
            }
        };
        self.deps.events.emit(CommerceEvent::CouponApplied {
            cart_id,
            code: coupon.code.clone(),
        });
        Ok(coupon)
    }

    /// Re-check every line against live stock and flag unavailable lines.
    pub async fn check_availability(&self) -> Result<AvailabilityReport, CommerceError> {
        let cart = self.cart();
        let report = check_availability(&cart, self.deps.catalog.as_ref()).await?;

        let (_, updated) = self.store.update(|cart| {
            cart.apply_availability(&report);
            Ok(())
        })?;
        if !updated.owner.is_authenticated() {
            self.local.save_cart(&updated)?;
        }

        let unavailable: Vec<_> = report
            .unavailable()
            .map(|line| line.cart_item_id.clone())
            .collect();
        if !unavailable.is_empty() {
            self.deps.events.emit(CommerceEvent::ItemsUnavailable {
                cart_id: updated.id,
                items: unavailable,
            });
        }
        Ok(report)
    }

    /// Reload the server cart.
    pub async fn refresh(&self) -> Result<Cart, CommerceError> {
        match self.owner() {
            CartOwner::Device(_) => Ok(self.cart()),
            CartOwner::User(user_id) => {
                self.apply_remote(&user_id, self.deps.api.fetch_cart(&user_id))
                    .await
            }
        }
    }

    /// Handle a successful login.
    ///
    /// The first trigger of an authenticated session merges the device cart
    /// into the server cart; repeated triggers are no-ops until [`logout`].
    ///
    /// [`logout`]: CartSession::logout
    pub async fn login(&self, user_id: UserId) -> Result<MergeOutcome, CommerceError> {
        match self.owner() {
            CartOwner::User(current) if current == user_id => {}
            CartOwner::User(_) => self.logout(),
            CartOwner::Device(_) => {}
        }
        *self.owner.write() = CartOwner::User(user_id.clone());

        let outcome = self
            .sync
            .merge_on_login(
                &user_id,
                &self.local,
                self.deps.api.as_ref(),
                &self.deps.validator,
                self.deps.catalog.as_ref(),
            )
            .await;

        match outcome {
            Ok(MergeOutcome::Skipped) => Ok(MergeOutcome::Skipped),
            Ok(MergeOutcome::Empty) => {
                self.store.replace(Cart::for_user(user_id.clone()));
                self.refresh().await?;
                Ok(MergeOutcome::Empty)
            }
            Ok(MergeOutcome::Merged(report)) => {
                self.store.replace(report.server_cart.clone());
                self.emit_updated(&report.server_cart);
                self.deps.events.emit(CommerceEvent::MergeCompleted {
                    user_id: user_id.clone(),
                    transferred: report.transferred,
                    failed: report.failed.len(),
                });
                if report.is_partial() {
                    self.deps.events.emit(CommerceEvent::MergeItemsDropped {
                        user_id,
                        sneakers: report
                            .failed
                            .iter()
                            .filter_map(|f| f.line.sneaker_id.as_deref().map(SneakerId::new))
                            .collect(),
                    });
                }
                Ok(MergeOutcome::Merged(report))
            }
            Err(e) => {
                if let CommerceError::MergeFailed { attempted } = &e {
                    self.deps.events.emit(CommerceEvent::MergeFailed {
                        user_id: user_id.clone(),
                        attempted: *attempted,
                    });
                }
                self.store.replace(Cart::for_user(user_id));
                if let Err(refresh_error) = self.refresh().await {
                    tracing::warn!(error = %refresh_error, "could not load server cart after failed merge");
                }
                Err(e)
            }
        }
    }

    /// Drop to an anonymous, empty cart without contacting the server.
    ///
    /// The device cache is emptied too; anything a failed merge left there is
    /// parked for the signed-out user and returns on their next login.
    pub fn logout(&self) {
        let device = self.local.device().clone();
        let previous = {
            let mut owner = self.owner.write();
            std::mem::replace(&mut *owner, CartOwner::Device(device.clone()))
        };
        self.sync.reset();

        // Lines a failed merge left on the device go with the user who owned
        // them, so the store and the device cache both start empty.
        let parked = match &previous {
            CartOwner::User(user_id) => self.local.park_for(user_id),
            CartOwner::Device(_) => self.local.clear().map(|_| 0),
        };
        match parked {
            Ok(0) => {}
            Ok(lines) => tracing::info!(previous = ?previous, lines, "unmerged device lines parked"),
            Err(e) => tracing::warn!(error = %e, "could not clear device cart on logout"),
        }

        let old_cart_id = self.store.with(|cart| cart.id.clone());
        self.store.replace(Cart::new(
            CartOwner::Device(device),
            self.deps.validator.floor_price().currency,
        ));

        tracing::info!(previous = ?previous, "logged out, cart reset");
        self.deps.events.emit(CommerceEvent::CartCleared {
            cart_id: old_cart_id,
            reason: ClearReason::Logout,
        });
        self.deps.events.emit(CommerceEvent::LoggedOut);
    }

    /// Empty the cart after its order was paid.
    pub async fn complete_checkout(&self) -> Result<(), CommerceError> {
        let mut converted = self.cart();
        converted.mark_converted();
        self.deps.events.emit(CommerceEvent::CartStatusChanged {
            cart_id: converted.id.clone(),
            status: converted.status,
        });

        match self.owner() {
            CartOwner::Device(device) => {
                self.local.clear()?;
                self.store.replace(Cart::new(
                    CartOwner::Device(device),
                    self.deps.validator.floor_price().currency,
                ));
            }
            CartOwner::User(user_id) => {
                self.apply_remote(&user_id, self.deps.api.clear(&user_id))
                    .await?;
            }
        }

        self.deps.events.emit(CommerceEvent::CartCleared {
            cart_id: converted.id,
            reason: ClearReason::Converted,
        });
        Ok(())
    }
}

fn not_found_as_false(result: Result<Cart, CommerceError>) -> Result<bool, CommerceError> {
    match result {
        Ok(_) => Ok(true),
        Err(CommerceError::ItemNotInCart(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, Variant};
    use crate::coupon::InMemoryCoupons;
    use crate::money::{Money, Rate};
    use crate::sync::{InMemoryCartServer, MockCartApi};
    use kickstore_cache::{Cache, DeviceKey};

    fn request(sneaker: &str) -> CartLineRequest {
        CartLineRequest {
            sneaker_id: Some(sneaker.into()),
            variant_id: Some(format!("{sneaker}-41")),
            size: Some("41".into()),
            color: Some("white".into()),
            quantity: Some(1),
            price: Some(Money::brl(30000)),
            name: Some(sneaker.into()),
            ..Default::default()
        }
    }

    fn session_with(api: Arc<dyn CartApi>, cache: Cache) -> CartSession {
        session_with_catalog(api, cache, Arc::new(InMemoryCatalog::new()))
    }

    fn session_with_catalog(
        api: Arc<dyn CartApi>,
        cache: Cache,
        catalog: Arc<InMemoryCatalog>,
    ) -> CartSession {
        let coupons = InMemoryCoupons::new();
        coupons.insert(Coupon::percentage("TEN", Rate::percent(10)));
        let deps = SessionDeps {
            api,
            catalog,
            coupons: Arc::new(coupons),
            validator: IntegrityValidator::default(),
            events: EventBus::default(),
        };
        CartSession::restore(LocalCartStore::new(cache, DeviceKey::new("dev_1")), deps).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_add_persists_locally() {
        let cache = Cache::in_memory();
        let session = session_with(Arc::new(InMemoryCartServer::new()), cache.clone());

        session.add_item(&request("air-max")).await.unwrap();
        assert_eq!(session.cart().items().len(), 1);

        // A fresh session on the same device sees the line.
        let reopened = session_with(Arc::new(InMemoryCartServer::new()), cache);
        assert_eq!(reopened.cart().items().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_line_never_reaches_cart() {
        let session = session_with(Arc::new(InMemoryCartServer::new()), Cache::in_memory());
        let mut bad = request("air-max");
        bad.sneaker_id = None;

        assert!(matches!(
            session.add_item(&bad).await,
            Err(CommerceError::MissingIdentity(_))
        ));
        assert!(session.cart().is_empty());
    }

    #[tokio::test]
    async fn test_failed_remote_call_keeps_state() {
        let mut api = MockCartApi::new();
        api.expect_add_item()
            .returning(|_, _| Err(CommerceError::Transport("503".into())));
        api.expect_fetch_cart()
            .returning(|user| Ok(Cart::for_user(user.clone())));
        let session = session_with(Arc::new(api), Cache::in_memory());
        session.login(UserId::new("u1")).await.unwrap();

        let mut events = session.events().subscribe();
        let before = session.cart();
        assert!(session.add_item(&request("air-max")).await.is_err());
        assert_eq!(session.cart(), before);
        assert!(matches!(
            events.recv().await.unwrap(),
            CommerceEvent::SyncFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_login_merges_once_and_logout_resets() {
        let server = Arc::new(InMemoryCartServer::new());
        let session = session_with(server.clone(), Cache::in_memory());
        let user = UserId::new("u1");

        session.add_item(&request("air-max")).await.unwrap();
        let outcome = session.login(user.clone()).await.unwrap();
        assert!(matches!(outcome, MergeOutcome::Merged(_)));
        assert!(session.is_authenticated());
        assert_eq!(session.cart().items().len(), 1);

        assert_eq!(session.login(user.clone()).await.unwrap(), MergeOutcome::Skipped);
        assert_eq!(server.stored(&user).unwrap().items().len(), 1);

        session.logout();
        assert!(!session.is_authenticated());
        assert!(session.cart().is_empty());
        assert!(!session.sync().has_merged());
        // Server cart is untouched by logout.
        assert_eq!(server.stored(&user).unwrap().items().len(), 1);
    }

    #[tokio::test]
    async fn test_mutations_flag_lines_beyond_stock() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.add_variant(Variant::new("air-max-41", "air-max", "41", "white", 1));
        let session = session_with_catalog(
            Arc::new(InMemoryCartServer::new()),
            Cache::in_memory(),
            catalog,
        );
        let mut events = session.events().subscribe();

        let mut three = request("air-max");
        three.quantity = Some(3);
        let cart = session.add_item(&three).await.unwrap();
        let line = &cart.items()[0];
        assert_eq!(line.quantity, 3);
        assert!(!line.is_available);
        assert!(line.out_of_stock_notified);
        assert_eq!(session.cart(), cart);

        let mut flagged = None;
        while let Ok(event) = events.try_recv() {
            if let CommerceEvent::ItemsUnavailable { items, .. } = event {
                flagged = Some(items);
            }
        }
        assert_eq!(flagged, Some(vec![line.cart_item_id.clone()]));

        let id = line.cart_item_id.clone();
        assert!(session.update_quantity(&id, 1).await.unwrap());
        assert!(session.cart().items()[0].is_available);
    }

    #[tokio::test]
    async fn test_logout_leaves_no_device_lines_behind() {
        let cache = Cache::in_memory();
        let mut api = MockCartApi::new();
        api.expect_add_item()
            .returning(|_, _| Err(CommerceError::Transport("503".into())));
        api.expect_fetch_cart()
            .returning(|user| Ok(Cart::for_user(user.clone())));
        let session = session_with(Arc::new(api), cache.clone());
        let local = LocalCartStore::new(cache, DeviceKey::new("dev_1"));
        let ana = UserId::new("ana");

        session.add_item(&request("air-max")).await.unwrap();
        assert!(session.login(ana.clone()).await.is_err());
        assert_eq!(local.load().unwrap().len(), 1);

        session.logout();
        assert!(session.cart().is_empty());
        assert!(local.load().unwrap().is_empty());
        assert_eq!(local.parked(&ana).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_missing_line_is_not_an_error() {
        let server = Arc::new(InMemoryCartServer::new());
        let session = session_with(server, Cache::in_memory());
        session.login(UserId::new("u1")).await.unwrap();

        let removed = session
            .remove_item(&CartItemId::new("missing"))
            .await
            .unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_coupon_applies_to_cart_total() {
        let session = session_with(Arc::new(InMemoryCartServer::new()), Cache::in_memory());
        session.add_item(&request("air-max")).await.unwrap();

        let coupon = session.apply_coupon("ten").await.unwrap();
        assert_eq!(coupon.code, "TEN");
        let cart = session.cart();
        assert_eq!(cart.discount(), Money::brl(3000));
        assert_eq!(cart.final_price(), Money::brl(27000));
    }

    #[tokio::test]
    async fn test_complete_checkout_empties_cart() {
        let cache = Cache::in_memory();
        let session = session_with(Arc::new(InMemoryCartServer::new()), cache.clone());
        session.add_item(&request("air-max")).await.unwrap();

        session.complete_checkout().await.unwrap();
        assert!(session.cart().is_empty());
        let reopened = session_with(Arc::new(InMemoryCartServer::new()), cache);
        assert!(reopened.cart().is_empty());
    }
}
