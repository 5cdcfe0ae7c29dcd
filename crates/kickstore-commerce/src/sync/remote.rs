//! Server-persisted carts.

use crate::cart::{Cart, NewCartItem};
use crate::coupon::AppliedCoupon;
use crate::error::CommerceError;
use crate::ids::{CartItemId, SneakerId, UserId};
use async_trait::async_trait;
use mockall::automock;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// `GET/POST/PATCH/DELETE /carts[/:cartItemId]`.
///
/// Every call returns the full server cart after the mutation.
#[automock]
#[async_trait]
pub trait CartApi: Send + Sync {
    async fn fetch_cart(&self, user_id: &UserId) -> Result<Cart, CommerceError>;

    async fn add_item(&self, user_id: &UserId, item: &NewCartItem) -> Result<Cart, CommerceError>;

    async fn update_quantity(
        &self,
        user_id: &UserId,
        cart_item_id: &CartItemId,
        quantity: i64,
    ) -> Result<Cart, CommerceError>;

    async fn remove_item(
        &self,
        user_id: &UserId,
        cart_item_id: &CartItemId,
    ) -> Result<Cart, CommerceError>;

    async fn apply_coupon(
        &self,
        user_id: &UserId,
        coupon: &AppliedCoupon,
    ) -> Result<Cart, CommerceError>;

    async fn clear(&self, user_id: &UserId) -> Result<Cart, CommerceError>;
}

/// In-memory cart server for development and tests.
///
/// Each mutation reads the stored document, yields, then writes the whole
/// document back, with no version check. Two concurrent mutations for the
/// same user can therefore overwrite each other, as they can against the
/// real server.
#[derive(Debug, Default)]
pub struct InMemoryCartServer {
    carts: RwLock<HashMap<UserId, Cart>>,
    rejected: RwLock<HashSet<SneakerId>>,
    offline: AtomicBool,
}

impl InMemoryCartServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `add_item` fail for a sneaker.
    pub fn reject_sneaker(&self, sneaker_id: SneakerId) {
        self.rejected.write().insert(sneaker_id);
    }

    /// Make every call fail with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Stored cart of a user, if any.
    pub fn stored(&self, user_id: &UserId) -> Option<Cart> {
        self.carts.read().get(user_id).cloned()
    }

    fn check_online(&self) -> Result<(), CommerceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CommerceError::Transport("cart server unreachable".to_string()));
        }
        Ok(())
    }

    fn read(&self, user_id: &UserId) -> Cart {
        self.stored(user_id)
            .unwrap_or_else(|| Cart::for_user(user_id.clone()))
    }

    fn write(&self, user_id: &UserId, cart: Cart) -> Cart {
        self.carts.write().insert(user_id.clone(), cart.clone());
        cart
    }

    async fn read_modify_write(
        &self,
        user_id: &UserId,
        mutate: impl FnOnce(&mut Cart) -> Result<(), CommerceError> + Send,
    ) -> Result<Cart, CommerceError> {
        self.check_online()?;
        let mut cart = self.read(user_id);
        tokio::task::yield_now().await;
        mutate(&mut cart)?;
        Ok(self.write(user_id, cart))
    }
}

#[async_trait]
impl CartApi for InMemoryCartServer {
    async fn fetch_cart(&self, user_id: &UserId) -> Result<Cart, CommerceError> {
        self.check_online()?;
        Ok(self.read(user_id))
    }

    async fn add_item(&self, user_id: &UserId, item: &NewCartItem) -> Result<Cart, CommerceError> {
        if self.rejected.read().contains(&item.sneaker_id) {
            return Err(CommerceError::Transport(format!(
                "server rejected sneaker {}",
                item.sneaker_id
            )));
        }
        let item = item.clone();
        self.read_modify_write(user_id, move |cart| cart.add_item(item).map(|_| ()))
            .await
    }

    async fn update_quantity(
        &self,
        user_id: &UserId,
        cart_item_id: &CartItemId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        self.read_modify_write(user_id, |cart| {
            if cart.update_quantity(cart_item_id, quantity)? {
                Ok(())
            } else {
                Err(CommerceError::ItemNotInCart(cart_item_id.to_string()))
            }
        })
        .await
    }

    async fn remove_item(
        &self,
        user_id: &UserId,
        cart_item_id: &CartItemId,
    ) -> Result<Cart, CommerceError> {
        self.read_modify_write(user_id, |cart| {
            if cart.remove_item(cart_item_id)? {
                Ok(())
            } else {
                Err(CommerceError::ItemNotInCart(cart_item_id.to_string()))
            }
        })
        .await
    }

    async fn apply_coupon(
        &self,
        user_id: &UserId,
        coupon: &AppliedCoupon,
    ) -> Result<Cart, CommerceError> {
        let coupon = coupon.clone();
        self.read_modify_write(user_id, move |cart| cart.apply_coupon(coupon))
            .await
    }

    async fn clear(&self, user_id: &UserId) -> Result<Cart, CommerceError> {
        self.check_online()?;
        Ok(self.write(user_id, Cart::for_user(user_id.clone())))
    }
}
