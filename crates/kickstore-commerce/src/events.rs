//! Events emitted after state transitions, for an outer layer to render.

use crate::cart::CartStatus;
use crate::checkout::OrderStatus;
use crate::ids::{CartId, CartItemId, OrderId, PaymentId, SneakerId, UserId};
use crate::money::Money;
use crate::payment::PaymentMethod;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Why a cart was emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    /// The shopper emptied it.
    Requested,
    /// The session logged out.
    Logout,
    /// Its order was paid.
    Converted,
}

/// Something the storefront may want to tell the shopper about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CommerceEvent {
    CartUpdated {
        cart_id: CartId,
        item_count: i64,
        final_price: Money,
    },
    CartCleared {
        cart_id: CartId,
        reason: ClearReason,
    },
    CartStatusChanged {
        cart_id: CartId,
        status: CartStatus,
    },
    ItemsUnavailable {
        cart_id: CartId,
        items: Vec<CartItemId>,
    },
    CouponApplied {
        cart_id: CartId,
        code: String,
    },
    MergeCompleted {
        user_id: UserId,
        transferred: usize,
        failed: usize,
    },
    /// Local lines that did not reach the server cart and were dropped.
    MergeItemsDropped {
        user_id: UserId,
        sneakers: Vec<SneakerId>,
    },
    MergeFailed {
        user_id: UserId,
        attempted: usize,
    },
    SyncFailed {
        message: String,
    },
    LoggedOut,
    OrderCreated {
        order_id: OrderId,
        total: Money,
    },
    OrderStatusChanged {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
    PaymentGenerated {
        order_id: OrderId,
        payment_id: PaymentId,
        method: PaymentMethod,
    },
    PaymentSettled {
        order_id: OrderId,
        payment_id: PaymentId,
    },
    PaymentFailed {
        order_id: OrderId,
        method: PaymentMethod,
        reason: String,
        retryable: bool,
    },
    PaymentExpired {
        order_id: OrderId,
        payment_id: PaymentId,
    },
}

/// Broadcast bus for [`CommerceEvent`]s. Clones share the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CommerceEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CommerceEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: CommerceEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("event dropped, no subscribers");
        }
    }
}
