//! Observable holder of the current cart.

use crate::cart::Cart;
use crate::error::CommerceError;
use tokio::sync::watch;

/// The current cart snapshot plus its subscribers.
///
/// Mutations run against a copy and are published only when they succeed,
/// so a failed mutation leaves the visible cart untouched.
#[derive(Debug)]
pub struct CartStore {
    sender: watch::Sender<Cart>,
}

impl CartStore {
    pub fn new(cart: Cart) -> Self {
        let (sender, _) = watch::channel(cart);
        Self { sender }
    }

    /// A copy of the current cart.
    pub fn snapshot(&self) -> Cart {
        self.sender.borrow().clone()
    }

    /// Read the current cart without copying it.
    pub fn with<R>(&self, f: impl FnOnce(&Cart) -> R) -> R {
        f(&self.sender.borrow())
    }

    /// Listen for cart changes.
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.sender.subscribe()
    }

    /// Replace the cart wholesale, e.g. with the server's copy.
    pub fn replace(&self, cart: Cart) {
        self.sender.send_replace(cart);
    }

    /// Apply a mutation and publish the result if it succeeds.
    pub fn update<R>(
        &self,
        mutate: impl FnOnce(&mut Cart) -> Result<R, CommerceError>,
    ) -> Result<(R, Cart), CommerceError> {
        let mut cart = self.snapshot();
        let result = mutate(&mut cart)?;
        self.sender.send_replace(cart.clone());
        Ok((result, cart))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;

    #[tokio::test]
    async fn test_subscribers_see_replacements() {
        let store = CartStore::new(Cart::for_user(UserId::new("a")));
        let mut rx = store.subscribe();

        let next = Cart::for_user(UserId::new("b"));
        let next_id = next.id.clone();
        store.replace(next);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().id, next_id);
    }

    #[test]
    fn test_failed_update_leaves_cart_untouched() {
        let store = CartStore::new(Cart::for_user(UserId::new("a")));
        let before = store.snapshot();

        let result = store.update(|cart| {
            cart.mark_abandoned();
            Err::<(), _>(CommerceError::InvalidQuantity(0))
        });
        assert!(result.is_err());
        assert_eq!(store.snapshot(), before);
    }
}
