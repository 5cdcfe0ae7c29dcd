//! Cart line items.

use crate::catalog::VariantRef;
use crate::error::CommerceError;
use crate::ids::{CartItemId, SneakerId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Composite identity of a cart line: two adds with the same key land on one line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub sneaker_id: SneakerId,
    pub variant: VariantRef,
    pub size: String,
    pub color: String,
}

/// A validated request to put a sneaker variant in the cart.
///
/// Built by [`crate::validation::IntegrityValidator`], which guarantees a
/// non-blank sneaker id, a resolved variant and a positive price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCartItem {
    pub sneaker_id: SneakerId,
    pub variant: VariantRef,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    pub price: Money,
    pub name: String,
    pub brand: Option<String>,
    pub image: Option<String>,
    pub slug: Option<String>,
}

impl NewCartItem {
    pub fn key(&self) -> ItemKey {
        ItemKey {
            sneaker_id: self.sneaker_id.clone(),
            variant: self.variant.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }
}

/// A line in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Stable external identifier for update/removal.
    pub cart_item_id: CartItemId,
    pub sneaker_id: SneakerId,
    pub variant: VariantRef,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    /// Current reference price.
    pub price: Money,
    /// Price snapshot taken when the line was created.
    pub price_at_time_of_addition: Money,
    /// Per-unit discount.
    pub discount: Money,
    final_price: Money,
    /// Last-known stock flag.
    pub is_available: bool,
    pub out_of_stock_notified: bool,
    pub name: String,
    pub brand: Option<String>,
    pub image: Option<String>,
    pub slug: Option<String>,
}

impl CartItem {
    /// Create a line from a validated request.
    pub fn from_new(item: NewCartItem) -> Self {
        Self::with_id(CartItemId::generate(), item)
    }

    /// Create a line keeping an externally assigned identifier.
    pub fn with_id(cart_item_id: CartItemId, item: NewCartItem) -> Self {
        let mut line = Self {
            cart_item_id,
            sneaker_id: item.sneaker_id,
            variant: item.variant,
            size: item.size,
            color: item.color,
            quantity: item.quantity,
            price: item.price,
            price_at_time_of_addition: item.price,
            discount: Money::zero(item.price.currency),
            final_price: item.price,
            is_available: true,
            out_of_stock_notified: false,
            name: item.name,
            brand: item.brand,
            image: item.image,
            slug: item.slug,
        };
        line.recompute();
        line
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            sneaker_id: self.sneaker_id.clone(),
            variant: self.variant.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    /// Unit price after the line discount, never negative.
    pub fn final_price(&self) -> Money {
        self.final_price
    }

    /// `price * quantity`.
    pub fn line_total(&self) -> Result<Money, CommerceError> {
        self.price
            .try_multiply(self.quantity)
            .ok_or(CommerceError::Overflow)
    }

    pub(crate) fn recompute(&mut self) {
        self.final_price = self
            .price
            .try_subtract(&self.discount)
            .map(|m| m.non_negative())
            .unwrap_or(self.price);
    }

    /// Convert back into the request that would recreate this line.
    pub fn to_new(&self) -> NewCartItem {
        NewCartItem {
            sneaker_id: self.sneaker_id.clone(),
            variant: self.variant.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
            quantity: self.quantity,
            price: self.price,
            name: self.name.clone(),
            brand: self.brand.clone(),
            image: self.image.clone(),
            slug: self.slug.clone(),
        }
    }
}
