//! Newtype IDs for type-safe identifiers.
//!
//! Using newtypes prevents accidentally mixing up different ID types,
//! e.g., passing a SneakerId where a VariantId is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($name:ident) => {
        /// A unique identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new unique ID.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().simple().to_string())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the ID is blank (empty or whitespace only).
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(SneakerId);
define_id!(VariantId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(UserId);
define_id!(AddressId);
define_id!(ShippingMethodId);
define_id!(PaymentId);
define_id!(CouponId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id = SneakerId::new("air-max-90");
        assert_eq!(id.as_str(), "air-max-90");
    }

    #[test]
    fn test_id_generation() {
        let id1 = CartItemId::generate();
        let id2 = CartItemId::generate();
        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 32);
    }

    #[test]
    fn test_blank_id() {
        assert!(SneakerId::new("   ").is_blank());
        assert!(!SneakerId::new("x").is_blank());
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = OrderId::new("ord-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""ord-1""#);
    }
}
