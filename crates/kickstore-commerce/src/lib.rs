//! Cart consistency, checkout and payment orchestration for Kickstore.
//!
//! This crate keeps a sneaker cart coherent across an anonymous device and an
//! authenticated account, and drives it through checkout to a paid order:
//!
//! - **Cart**: lines keyed by (sneaker, variant, size, color), derived totals
//! - **Validation**: price floor and identity checks before anything reaches a cart
//! - **Sync**: device cache, server cart, merge-on-login, identity-aware session
//! - **Checkout**: gated step flow, quotes, immutable orders and their state machine
//! - **Payment**: PIX, Boleto and credit card adapters over a gateway
//!
//! # Example
//!
//! ```rust,ignore
//! use kickstore_commerce::prelude::*;
//!
//! let session = Arc::new(CartSession::restore(local, deps)?);
//! session.add_item(&request).await?;
//! session.login(UserId::new("u1")).await?;
//!
//! let checkout = CheckoutOrchestrator::new(session, orders, payments, Rate::percent(5));
//! let mut flow = checkout.begin();
//! checkout.advance(&mut flow).await?;
//! // ... address, shipping, payment method ...
//! let order = checkout.submit(&mut flow).await?;
//! let artifact = checkout.pay(&order.id, Some(email), None).await?;
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod coupon;
pub mod events;
pub mod pagination;
pub mod payment;
pub mod store;
pub mod sync;
pub mod validation;

pub use error::{CommerceError, ErrorKind};
pub use ids::*;
pub use money::{Currency, Money, Rate};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CommerceError, ErrorKind};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money, Rate};

    // Catalog
    pub use crate::catalog::{CatalogReader, CompositeVariantKey, Variant, VariantRef};

    // Cart
    pub use crate::cart::{
        check_availability, AvailabilityReport, Cart, CartItem, CartOwner, CartStatus,
        LineAvailability, NewCartItem,
    };
    pub use crate::coupon::{AppliedCoupon, Coupon, CouponValidator, CouponValue};
    pub use crate::store::CartStore;
    pub use crate::validation::{CartLineRequest, IntegrityValidator};

    // Sync
    pub use crate::sync::{
        CartApi, CartSession, LocalCartStore, MergeOutcome, MergeReport, SessionDeps, SyncEngine,
    };

    // Checkout
    pub use crate::checkout::{
        quote, Address, CheckoutFlow, CheckoutOrchestrator, CheckoutQuote, CheckoutStep, Order,
        OrderItem, OrderRepository, OrderStatus, ShippingMethod, ShippingSelection,
    };

    // Payment
    pub use crate::payment::{
        CardToken, PaymentAdapter, PaymentAdapters, PaymentArtifact, PaymentError, PaymentGateway,
        PaymentMethod, PaymentStatus,
    };

    pub use crate::config::CommerceConfig;
    pub use crate::events::{CommerceEvent, EventBus};
    pub use crate::pagination::{Page, PageCursor, Pagination};
}
