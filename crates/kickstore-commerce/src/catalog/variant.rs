//! Variant (stock-keeping unit) types.

use crate::ids::{SneakerId, VariantId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A sellable (sneaker, size, color) combination with a live stock counter.
///
/// Stock is owned by fulfillment; the cart only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Variant {
    /// Canonical variant identifier.
    pub id: VariantId,
    /// Parent sneaker.
    pub sneaker_id: SneakerId,
    /// Size label (e.g., "42").
    pub size: String,
    /// Color label.
    pub color: String,
    /// Units on hand.
    pub stock: i64,
}

impl Variant {
    pub fn new(
        id: impl Into<VariantId>,
        sneaker_id: impl Into<SneakerId>,
        size: impl Into<String>,
        color: impl Into<String>,
        stock: i64,
    ) -> Self {
        Self {
            id: id.into(),
            sneaker_id: sneaker_id.into(),
            size: size.into(),
            color: color.into(),
            stock,
        }
    }

    /// Units that can still be sold.
    pub fn available(&self) -> i64 {
        self.stock.max(0)
    }

    /// Check if a specific quantity is available.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.available() >= quantity
    }

    /// Check if out of stock.
    pub fn is_out_of_stock(&self) -> bool {
        self.available() == 0
    }

    /// The composite key this variant answers to.
    pub fn composite_key(&self) -> CompositeVariantKey {
        CompositeVariantKey::new(self.sneaker_id.clone(), &self.size, &self.color)
    }

    /// Whether a reference points at this variant.
    pub fn matches(&self, reference: &VariantRef) -> bool {
        match reference {
            VariantRef::Canonical(id) => &self.id == id,
            VariantRef::Composite(key) => {
                key.sneaker_id == self.sneaker_id
                    && key.size.eq_ignore_ascii_case(&self.size)
                    && key.color.eq_ignore_ascii_case(&self.color)
            }
        }
    }
}

/// Composite key for callers that do not carry a canonical variant id.
///
/// Compatibility shim for legacy callers; new code should send canonical ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeVariantKey {
    pub sneaker_id: SneakerId,
    pub size: String,
    pub color: String,
}

impl CompositeVariantKey {
    pub fn new(sneaker_id: SneakerId, size: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            sneaker_id,
            size: size.into(),
            color: color.into(),
        }
    }

    /// The string-concatenated key legacy callers send as a variant id.
    pub fn legacy_key(&self) -> String {
        format!("{}-{}-{}", self.sneaker_id, self.size, self.color)
    }
}

/// How a line item points at its variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VariantRef {
    /// Canonical catalog identifier.
    Canonical(VariantId),
    /// Synthesized (sneaker, size, color) key.
    Composite(CompositeVariantKey),
}

impl VariantRef {
    pub fn is_canonical(&self) -> bool {
        matches!(self, VariantRef::Canonical(_))
    }

    /// Canonical id, if this reference carries one.
    pub fn canonical_id(&self) -> Option<&VariantId> {
        match self {
            VariantRef::Canonical(id) => Some(id),
            VariantRef::Composite(_) => None,
        }
    }

    /// Flat string form used on the wire.
    pub fn wire_key(&self) -> String {
        match self {
            VariantRef::Canonical(id) => id.to_string(),
            VariantRef::Composite(key) => key.legacy_key(),
        }
    }
}

impl fmt::Display for VariantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_key())
    }
}
