//! Price and identity integrity checks applied before anything reaches a cart.

use crate::cart::NewCartItem;
use crate::catalog::{CatalogReader, CompositeVariantKey, VariantRef};
use crate::error::CommerceError;
use crate::ids::{SneakerId, VariantId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Default last-resort unit price: R$ 1,00.
pub const DEFAULT_FLOOR_PRICE_CENTS: i64 = 100;

/// A loosely-typed add-to-cart request as it arrives from a caller or the device cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartLineRequest {
    pub sneaker_id: Option<String>,
    pub variant_id: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: Option<i64>,
    /// Price the caller claims.
    pub price: Option<Money>,
    /// Reference price to fall back to.
    pub fallback_price: Option<Money>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub image: Option<String>,
    pub slug: Option<String>,
}

/// Which link of the fallback chain produced a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Explicit,
    Fallback,
    Floor,
}

/// A positive price and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub amount: Money,
    pub source: PriceSource,
}

/// Resolve a variant reference from loosely-typed identity fields.
///
/// A non-blank variant id wins. Without one, a (sneaker, size, color)
/// composite key is accepted as a compatibility shim.
pub fn resolve_variant(
    sneaker_id: &SneakerId,
    variant_id: Option<&str>,
    size: Option<&str>,
    color: Option<&str>,
) -> Result<VariantRef, CommerceError> {
    if let Some(id) = variant_id.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(VariantRef::Canonical(VariantId::new(id)));
    }

    match (non_blank(size), non_blank(color)) {
        (Some(size), Some(color)) => {
            let key = CompositeVariantKey::new(sneaker_id.clone(), size, color);
            tracing::warn!(
                legacy_key = %key.legacy_key(),
                "line item without canonical variant id, using composite key"
            );
            Ok(VariantRef::Composite(key))
        }
        _ => Err(CommerceError::MissingIdentity("variant id or size and color")),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validates line items at the cart boundary.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityValidator {
    floor_price: Money,
}

impl Default for IntegrityValidator {
    fn default() -> Self {
        Self::new(Money::new(DEFAULT_FLOOR_PRICE_CENTS, Currency::default()))
    }
}

impl IntegrityValidator {
    pub fn new(floor_price: Money) -> Self {
        Self { floor_price }
    }

    pub fn floor_price(&self) -> Money {
        self.floor_price
    }

    /// Resolve a price through explicit → fallback → floor.
    pub fn resolve_price(
        &self,
        explicit: Option<Money>,
        fallback: Option<Money>,
    ) -> Result<ResolvedPrice, CommerceError> {
        if let Some(amount) = explicit.filter(Money::is_positive) {
            return Ok(ResolvedPrice {
                amount,
                source: PriceSource::Explicit,
            });
        }
        if let Some(amount) = fallback.filter(Money::is_positive) {
            return Ok(ResolvedPrice {
                amount,
                source: PriceSource::Fallback,
            });
        }
        if self.floor_price.is_positive() {
            return Ok(ResolvedPrice {
                amount: self.floor_price,
                source: PriceSource::Floor,
            });
        }
        Err(CommerceError::UnresolvablePrice("floor price".to_string()))
    }

    /// Turn a raw request into a validated line, without consulting the catalog.
    pub fn validate(&self, request: &CartLineRequest) -> Result<NewCartItem, CommerceError> {
        let sneaker_id = request
            .sneaker_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(SneakerId::new)
            .ok_or(CommerceError::MissingIdentity("sneaker id"))?;

        let variant = resolve_variant(
            &sneaker_id,
            request.variant_id.as_deref(),
            request.size.as_deref(),
            request.color.as_deref(),
        )?;

        let quantity = request.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        let price = self
            .resolve_price(request.price, request.fallback_price)
            .map_err(|_| CommerceError::UnresolvablePrice(sneaker_id.to_string()))?;
        if price.source != PriceSource::Explicit {
            tracing::warn!(
                sneaker_id = %sneaker_id,
                source = ?price.source,
                price = %price.amount,
                "line item price resolved through fallback"
            );
        }

        Ok(NewCartItem {
            name: request
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| sneaker_id.to_string()),
            sneaker_id,
            variant,
            size: request.size.clone().unwrap_or_default(),
            color: request.color.clone().unwrap_or_default(),
            quantity,
            price: price.amount,
            brand: request.brand.clone(),
            image: request.image.clone(),
            slug: request.slug.clone(),
        })
    }

    /// Validate, filling a missing fallback price from the catalog's reference price.
    pub async fn validate_with_catalog<C>(
        &self,
        request: &CartLineRequest,
        catalog: &C,
    ) -> Result<NewCartItem, CommerceError>
    where
        C: CatalogReader + ?Sized,
    {
        let needs_fallback = !request.price.is_some_and(|p| p.is_positive())
            && !request.fallback_price.is_some_and(|p| p.is_positive());

        match request.sneaker_id.as_deref().map(str::trim) {
            Some(id) if needs_fallback && !id.is_empty() => {
                let mut request = request.clone();
                request.fallback_price = catalog.reference_price(&SneakerId::new(id)).await?;
                self.validate(&request)
            }
            _ => self.validate(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MockCatalogReader;

    fn request() -> CartLineRequest {
        CartLineRequest {
            sneaker_id: Some("yeezy-350".into()),
            variant_id: Some("v-350-42".into()),
            size: Some("42".into()),
            color: Some("zebra".into()),
            quantity: Some(1),
            price: Some(Money::brl(129990)),
            ..Default::default()
        }
    }

    #[test]
    fn test_price_fallback_chain() {
        let validator = IntegrityValidator::default();

        let p = validator
            .resolve_price(Some(Money::brl(500)), Some(Money::brl(400)))
            .unwrap();
        assert_eq!(p.source, PriceSource::Explicit);

        let p = validator
            .resolve_price(Some(Money::brl(0)), Some(Money::brl(400)))
            .unwrap();
        assert_eq!((p.source, p.amount), (PriceSource::Fallback, Money::brl(400)));

        let p = validator.resolve_price(None, Some(Money::brl(-1))).unwrap();
        assert_eq!((p.source, p.amount), (PriceSource::Floor, Money::brl(100)));
    }

    #[test]
    fn test_non_positive_floor_is_rejected() {
        let validator = IntegrityValidator::new(Money::brl(0));
        assert!(matches!(
            validator.resolve_price(None, None),
            Err(CommerceError::UnresolvablePrice(_))
        ));
    }

    #[test]
    fn test_zero_price_request_never_yields_zero_line() {
        let validator = IntegrityValidator::default();
        let mut req = request();
        req.price = Some(Money::brl(0));
        let item = validator.validate(&req).unwrap();
        assert!(item.price.is_positive());
    }

    #[test]
    fn test_missing_sneaker_id_rejected() {
        let validator = IntegrityValidator::default();
        let mut req = request();
        req.sneaker_id = Some("  ".into());
        assert!(matches!(
            validator.validate(&req),
            Err(CommerceError::MissingIdentity("sneaker id"))
        ));
    }

    #[test]
    fn test_composite_key_shim() {
        let validator = IntegrityValidator::default();
        let mut req = request();
        req.variant_id = None;
        let item = validator.validate(&req).unwrap();
        match item.variant {
            VariantRef::Composite(key) => assert_eq!(key.legacy_key(), "yeezy-350-42-zebra"),
            other => panic!("expected composite key, got {other:?}"),
        }
    }

    #[test]
    fn test_no_variant_identity_rejected() {
        let validator = IntegrityValidator::default();
        let mut req = request();
        req.variant_id = None;
        req.color = None;
        assert!(matches!(
            validator.validate(&req),
            Err(CommerceError::MissingIdentity(_))
        ));
    }

    #[test]
    fn test_quantity_defaults_and_rejects() {
        let validator = IntegrityValidator::default();
        let mut req = request();
        req.quantity = None;
        assert_eq!(validator.validate(&req).unwrap().quantity, 1);

        req.quantity = Some(0);
        assert!(matches!(
            validator.validate(&req),
            Err(CommerceError::InvalidQuantity(0))
        ));
    }

    #[tokio::test]
    async fn test_catalog_fallback_price() {
        let mut catalog = MockCatalogReader::new();
        catalog
            .expect_reference_price()
            .times(1)
            .returning(|_| Ok(Some(Money::brl(99990))));

        let validator = IntegrityValidator::default();
        let mut req = request();
        req.price = None;
        let item = validator.validate_with_catalog(&req, &catalog).await.unwrap();
        assert_eq!(item.price, Money::brl(99990));
    }

    #[tokio::test]
    async fn test_catalog_not_consulted_with_explicit_price() {
        let mut catalog = MockCatalogReader::new();
        catalog.expect_reference_price().never();

        let validator = IntegrityValidator::default();
        let item = validator
            .validate_with_catalog(&request(), &catalog)
            .await
            .unwrap();
        assert_eq!(item.price, Money::brl(129990));
    }
}
