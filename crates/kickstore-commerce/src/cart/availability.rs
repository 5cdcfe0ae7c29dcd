//! Live availability checks against variant stock.

use crate::cart::{Cart, CartItem};
use crate::catalog::{CatalogReader, VariantRef};
use crate::error::CommerceError;
use crate::ids::{CartItemId, SneakerId};
use serde::{Deserialize, Serialize};

/// Availability of one cart line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineAvailability {
    pub cart_item_id: CartItemId,
    pub sneaker_id: SneakerId,
    pub variant: VariantRef,
    pub name: String,
    /// Quantity in the cart.
    pub requested: i64,
    /// Units the variant can currently supply (0 when the variant is unknown).
    pub available: i64,
    /// Whether the catalog knows the variant at all.
    pub variant_found: bool,
}

impl LineAvailability {
    pub fn is_available(&self) -> bool {
        self.variant_found && self.available >= self.requested
    }
}

/// Per-line availability report for a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AvailabilityReport {
    pub lines: Vec<LineAvailability>,
}

impl AvailabilityReport {
    /// Lines that cannot be fulfilled.
    pub fn unavailable(&self) -> impl Iterator<Item = &LineAvailability> {
        self.lines.iter().filter(|l| !l.is_available())
    }

    pub fn all_available(&self) -> bool {
        self.lines.iter().all(LineAvailability::is_available)
    }

    pub fn line(&self, cart_item_id: &CartItemId) -> Option<&LineAvailability> {
        self.lines.iter().find(|l| &l.cart_item_id == cart_item_id)
    }

    /// Whether this report still describes the cart: same lines, same quantities.
    pub fn covers(&self, cart: &Cart) -> bool {
        self.lines.len() == cart.items().len()
            && cart.items().iter().all(|item| {
                self.line(&item.cart_item_id)
                    .is_some_and(|l| l.requested == item.quantity && l.variant == item.variant)
            })
    }

    /// `Err(Unavailable)` unless every line passed.
    pub fn into_result(self) -> Result<Self, CommerceError> {
        if self.all_available() {
            Ok(self)
        } else {
            Err(CommerceError::Unavailable(self))
        }
    }
}

/// Re-validate every cart line against its variant's live stock.
///
/// Reads stock only; nothing is reserved or decremented.
pub async fn check_availability<C>(
    cart: &Cart,
    catalog: &C,
) -> Result<AvailabilityReport, CommerceError>
where
    C: CatalogReader + ?Sized,
{
    let mut lines = Vec::with_capacity(cart.items().len());
    for item in cart.items() {
        lines.push(check_line(item, catalog).await?);
    }

    let report = AvailabilityReport { lines };
    let short = report.unavailable().count();
    if short > 0 {
        tracing::info!(cart_id = %cart.id, unavailable = short, "cart lines failed availability");
    }
    Ok(report)
}

/// Availability of a single line.
pub async fn check_line<C>(item: &CartItem, catalog: &C) -> Result<LineAvailability, CommerceError>
where
    C: CatalogReader + ?Sized,
{
    let variant = catalog.find_variant(&item.variant).await?;
    Ok(LineAvailability {
        cart_item_id: item.cart_item_id.clone(),
        sneaker_id: item.sneaker_id.clone(),
        variant: item.variant.clone(),
        name: item.name.clone(),
        requested: item.quantity,
        available: variant.as_ref().map(|v| v.available()).unwrap_or(0),
        variant_found: variant.is_some(),
    })
}
