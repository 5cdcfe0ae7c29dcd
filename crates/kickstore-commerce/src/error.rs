//! Commerce error types.

use crate::cart::AvailabilityReport;
use crate::checkout::OrderStatus;
use crate::payment::PaymentError;
use thiserror::Error;

/// Failure classes the storefront distinguishes when deciding how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A cart, order or payment call could not reach its collaborator.
    Transient,
    /// One or more cart lines failed live stock validation.
    Availability,
    /// A mutation was missing a required identity or price.
    Integrity,
    /// A payment adapter reported a failure.
    Payment,
    /// Merge-on-login could not transfer the local cart.
    Synchronization,
    /// An operation was attempted from the wrong checkout or order state.
    State,
    /// Configuration could not be loaded.
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::Availability => "availability",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Payment => "payment",
            ErrorKind::Synchronization => "synchronization",
            ErrorKind::State => "state",
            ErrorKind::Config => "config",
        }
    }
}

/// Errors that can occur in cart, checkout and payment operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Variant not found in the catalog.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// A line item arrived without a required identity.
    #[error("Missing identity: {0}")]
    MissingIdentity(&'static str),

    /// No positive price could be resolved for a line item.
    #[error("Unresolvable price for sneaker {0}")]
    UnresolvablePrice(String),

    /// One or more cart lines failed live stock validation.
    #[error("{} cart line(s) unavailable", .0.unavailable().count())]
    Unavailable(AvailabilityReport),

    /// Invalid checkout step transition.
    #[error("Invalid checkout transition from {from} to {to}")]
    InvalidCheckoutTransition { from: String, to: String },

    /// Checkout incomplete.
    #[error("Checkout incomplete: missing {0}")]
    CheckoutIncomplete(String),

    /// Order status change not permitted by the state machine.
    #[error("Invalid order transition from {} to {}", .from.as_str(), .to.as_str())]
    InvalidOrderTransition { from: OrderStatus, to: OrderStatus },

    /// Coupon rejected.
    #[error("Invalid coupon {code}: {reason}")]
    InvalidCoupon { code: String, reason: String },

    /// Payment adapter failure.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Merge-on-login transferred nothing.
    #[error("Cart merge failed: none of {attempted} local item(s) transferred")]
    MergeFailed { attempted: usize },

    /// Remote call failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Device-local cache failure.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CommerceError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::Transport(_) | CommerceError::Cache(_) => ErrorKind::Transient,
            CommerceError::Unavailable(_) | CommerceError::VariantNotFound(_) => {
                ErrorKind::Availability
            }
            CommerceError::MissingIdentity(_)
            | CommerceError::UnresolvablePrice(_)
            | CommerceError::InvalidQuantity(_)
            | CommerceError::QuantityExceedsLimit(..)
            | CommerceError::InvalidCoupon { .. }
            | CommerceError::CurrencyMismatch { .. }
            | CommerceError::Overflow
            | CommerceError::Serialization(_) => ErrorKind::Integrity,
            CommerceError::Payment(_) => ErrorKind::Payment,
            CommerceError::MergeFailed { .. } => ErrorKind::Synchronization,
            CommerceError::ItemNotInCart(_)
            | CommerceError::OrderNotFound(_)
            | CommerceError::InvalidCheckoutTransition { .. }
            | CommerceError::CheckoutIncomplete(_)
            | CommerceError::InvalidOrderTransition { .. } => ErrorKind::State,
            CommerceError::Config(_) => ErrorKind::Config,
        }
    }

    /// Every failure in this crate is recoverable at the user-interaction level.
    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// Whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        match self.kind() {
            ErrorKind::Transient => true,
            ErrorKind::Payment => matches!(self, CommerceError::Payment(e) if e.is_retryable()),
            _ => false,
        }
    }
}

impl From<kickstore_cache::CacheError> for CommerceError {
    fn from(e: kickstore_cache::CacheError) -> Self {
        CommerceError::Cache(e.to_string())
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CommerceError::Transport("timeout".into()).kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            CommerceError::MissingIdentity("sneaker id").kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            CommerceError::MergeFailed { attempted: 2 }.kind(),
            ErrorKind::Synchronization
        );
        assert_eq!(
            CommerceError::Unavailable(AvailabilityReport::default()).kind(),
            ErrorKind::Availability
        );
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(CommerceError::Transport("down".into()).is_retryable());
        assert!(!CommerceError::InvalidQuantity(0).is_retryable());
        assert!(CommerceError::InvalidQuantity(0).is_recoverable());
    }

    #[test]
    fn test_order_transition_message() {
        let err = CommerceError::InvalidOrderTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Invalid order transition from delivered to cancelled"
        );
    }
}
