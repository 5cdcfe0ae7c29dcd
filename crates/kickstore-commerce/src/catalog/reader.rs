//! Read-only access to catalog state.

use crate::catalog::{Variant, VariantRef};
use crate::error::CommerceError;
use crate::ids::SneakerId;
use crate::money::Money;
use async_trait::async_trait;
use mockall::automock;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display data for a sneaker, denormalized onto cart lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SneakerSummary {
    pub id: SneakerId,
    pub name: String,
    pub brand: String,
    pub slug: String,
    pub image: Option<String>,
    /// Current catalog price.
    pub price: Money,
}

/// Catalog lookups consumed by the validator and availability checks.
#[automock]
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Find the live variant a reference points at.
    async fn find_variant(&self, reference: &VariantRef) -> Result<Option<Variant>, CommerceError>;

    /// Current reference price of a sneaker, used as a price fallback.
    async fn reference_price(&self, sneaker_id: &SneakerId) -> Result<Option<Money>, CommerceError>;
}

/// In-memory catalog for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    sneakers: RwLock<HashMap<SneakerId, SneakerSummary>>,
    variants: RwLock<Vec<Variant>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sneaker(&self, sneaker: SneakerSummary) {
        self.sneakers.write().insert(sneaker.id.clone(), sneaker);
    }

    pub fn add_variant(&self, variant: Variant) {
        let mut variants = self.variants.write();
        variants.retain(|v| v.id != variant.id);
        variants.push(variant);
    }

    /// Overwrite stock, as a fulfillment system would.
    pub fn set_stock(&self, reference: &VariantRef, stock: i64) -> bool {
        match self.variants.write().iter_mut().find(|v| v.matches(reference)) {
            Some(variant) => {
                variant.stock = stock;
                true
            }
            None => false,
        }
    }

    /// Change a sneaker's catalog price.
    pub fn set_price(&self, sneaker_id: &SneakerId, price: Money) -> bool {
        match self.sneakers.write().get_mut(sneaker_id) {
            Some(sneaker) => {
                sneaker.price = price;
                true
            }
            None => false,
        }
    }

    pub fn sneaker(&self, sneaker_id: &SneakerId) -> Option<SneakerSummary> {
        self.sneakers.read().get(sneaker_id).cloned()
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn find_variant(&self, reference: &VariantRef) -> Result<Option<Variant>, CommerceError> {
        Ok(self
            .variants
            .read()
            .iter()
            .find(|v| v.matches(reference))
            .cloned())
    }

    async fn reference_price(&self, sneaker_id: &SneakerId) -> Result<Option<Money>, CommerceError> {
        Ok(self.sneakers.read().get(sneaker_id).map(|s| s.price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CompositeVariantKey;
    use crate::ids::VariantId;

    #[tokio::test]
    async fn test_lookup_by_either_reference() {
        let catalog = InMemoryCatalog::new();
        catalog.add_variant(Variant::new("v1", "jordan-1", "41", "red", 5));

        let canonical = VariantRef::Canonical(VariantId::new("v1"));
        let composite = VariantRef::Composite(CompositeVariantKey::new(
            SneakerId::new("jordan-1"),
            "41",
            "red",
        ));

        assert!(catalog.find_variant(&canonical).await.unwrap().is_some());
        assert!(catalog.find_variant(&composite).await.unwrap().is_some());

        assert!(catalog.set_stock(&canonical, 0));
        let v = catalog.find_variant(&composite).await.unwrap().unwrap();
        assert!(v.is_out_of_stock());
    }

    #[tokio::test]
    async fn test_reference_price() {
        let catalog = InMemoryCatalog::new();
        let id = SneakerId::new("jordan-1");
        catalog.add_sneaker(SneakerSummary {
            id: id.clone(),
            name: "Air Jordan 1".into(),
            brand: "Nike".into(),
            slug: "air-jordan-1".into(),
            image: None,
            price: Money::brl(89990),
        });

        assert_eq!(
            catalog.reference_price(&id).await.unwrap(),
            Some(Money::brl(89990))
        );
        assert_eq!(
            catalog.reference_price(&SneakerId::new("nope")).await.unwrap(),
            None
        );
    }
}
