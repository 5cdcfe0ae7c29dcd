//! Anonymous cart persisted in the device cache.

use crate::cart::{Cart, CartItem, CartOwner};
use crate::coupon::AppliedCoupon;
use crate::error::CommerceError;
use crate::ids::{CartItemId, UserId};
use crate::money::Money;
use crate::validation::{CartLineRequest, IntegrityValidator};
use kickstore_cache::{cache_key, Cache, DeviceKey};
use serde::{Deserialize, Serialize};

/// One line of the device-local cart.
///
/// Fields are optional because older clients wrote partial records; the
/// integrity validator repairs or rejects them on the way back in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalCartItem {
    pub cart_item_id: Option<CartItemId>,
    pub sneaker_id: Option<String>,
    pub variant_id: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Money>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub brand: Option<String>,
    pub slug: Option<String>,
}

impl LocalCartItem {
    pub fn from_cart_item(item: &CartItem) -> Self {
        Self {
            cart_item_id: Some(item.cart_item_id.clone()),
            sneaker_id: Some(item.sneaker_id.to_string()),
            variant_id: item.variant.canonical_id().map(ToString::to_string),
            size: Some(item.size.clone()),
            color: Some(item.color.clone()),
            quantity: Some(item.quantity),
            price: Some(item.price),
            name: Some(item.name.clone()),
            image: item.image.clone(),
            brand: item.brand.clone(),
            slug: item.slug.clone(),
        }
    }

    /// The loosely-typed request this line stands for.
    pub fn to_request(&self) -> CartLineRequest {
        CartLineRequest {
            sneaker_id: self.sneaker_id.clone(),
            variant_id: self.variant_id.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
            quantity: self.quantity,
            price: self.price,
            fallback_price: None,
            name: self.name.clone(),
            brand: self.brand.clone(),
            image: self.image.clone(),
            slug: self.slug.clone(),
        }
    }
}

/// The device-local cart record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalCart {
    pub items: Vec<LocalCartItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_coupon: Option<AppliedCoupon>,
}

impl LocalCart {
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            items: cart.items().iter().map(LocalCartItem::from_cart_item).collect(),
            applied_coupon: cart.applied_coupon().cloned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Reads and writes the anonymous cart of one device.
#[derive(Debug, Clone)]
pub struct LocalCartStore {
    cache: Cache,
    device: DeviceKey,
}

impl LocalCartStore {
    pub fn new(cache: Cache, device: DeviceKey) -> Self {
        Self { cache, device }
    }

    pub fn device(&self) -> &DeviceKey {
        &self.device
    }

    fn key(&self) -> String {
        cache_key!("cart", self.device)
    }

    fn parked_key(&self, user_id: &UserId) -> String {
        cache_key!("cart", self.device, "parked", user_id)
    }

    /// The stored record, or an empty one.
    pub fn load(&self) -> Result<LocalCart, CommerceError> {
        Ok(self.cache.get(&self.key())?.unwrap_or_default())
    }

    pub fn save(&self, cart: &LocalCart) -> Result<(), CommerceError> {
        self.cache.set(&self.key(), cart)?;
        Ok(())
    }

    pub fn save_cart(&self, cart: &Cart) -> Result<(), CommerceError> {
        self.save(&LocalCart::from_cart(cart))
    }

    pub fn clear(&self) -> Result<(), CommerceError> {
        self.cache.delete(&self.key())?;
        Ok(())
    }

    /// Move the device cart aside for `user_id`, leaving the device slot
    /// empty. Returns how many lines were moved.
    pub fn park_for(&self, user_id: &UserId) -> Result<usize, CommerceError> {
        let local = self.load()?;
        if local.is_empty() {
            self.clear()?;
            return Ok(0);
        }
        let moved = local.len();
        let key = self.parked_key(user_id);
        let mut parked: LocalCart = self.cache.get(&key)?.unwrap_or_default();
        parked.items.extend(local.items);
        self.cache.set(&key, &parked)?;
        self.clear()?;
        Ok(moved)
    }

    /// Fold lines parked for `user_id` back into the device cart. Returns how
    /// many lines came back.
    pub fn reclaim_for(&self, user_id: &UserId) -> Result<usize, CommerceError> {
        let key = self.parked_key(user_id);
        let Some(parked) = self.cache.get::<LocalCart>(&key)? else {
            return Ok(0);
        };
        let reclaimed = parked.len();
        let mut local = self.load()?;
        local.items.extend(parked.items);
        self.save(&local)?;
        self.cache.delete(&key)?;
        Ok(reclaimed)
    }

    pub fn parked(&self, user_id: &UserId) -> Result<LocalCart, CommerceError> {
        Ok(self.cache.get(&self.parked_key(user_id))?.unwrap_or_default())
    }

    /// Rebuild a cart from the stored record. Lines the validator rejects
    /// are skipped and logged; records sharing a composite key fold into
    /// one line.
    pub fn restore(&self, validator: &IntegrityValidator) -> Result<Cart, CommerceError> {
        let local = self.load()?;
        let mut cart = Cart::new(
            CartOwner::Device(self.device.clone()),
            validator.floor_price().currency,
        );
        for line in &local.items {
            match validator.validate(&line.to_request()) {
                Ok(item) if cart.find_by_key(&item.key()).is_some() => {
                    if let Err(e) = cart.add_item(item) {
                        tracing::warn!(device = %self.device, error = %e, "dropping duplicate local cart line");
                    }
                }
                Ok(item) => {
                    let line_id = line
                        .cart_item_id
                        .clone()
                        .filter(|id| !id.is_blank())
                        .unwrap_or_else(CartItemId::generate);
                    cart.push_line(CartItem::with_id(line_id, item))?;
                }
                Err(e) => {
                    tracing::warn!(device = %self.device, error = %e, "dropping invalid local cart line");
                }
            }
        }
        if let Some(coupon) = local.applied_coupon {
            cart.apply_coupon(coupon)?;
        }
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::NewCartItem;
    use crate::catalog::VariantRef;
    use crate::ids::{SneakerId, VariantId};

    fn store() -> LocalCartStore {
        LocalCartStore::new(Cache::in_memory(), DeviceKey::new("dev_test"))
    }

    #[test]
    fn test_round_trip_keeps_line_ids() {
        let store = store();
        let mut cart = Cart::for_device(store.device().clone());
        let id = cart
            .add_item(NewCartItem {
                sneaker_id: SneakerId::new("old-skool"),
                variant: VariantRef::Canonical(VariantId::new("os-39")),
                size: "39".into(),
                color: "black".into(),
                quantity: 2,
                price: Money::brl(39990),
                name: "Old Skool".into(),
                brand: Some("Vans".into()),
                image: None,
                slug: None,
            })
            .unwrap();
        store.save_cart(&cart).unwrap();

        let restored = store.restore(&IntegrityValidator::default()).unwrap();
        assert_eq!(restored.items().len(), 1);
        assert_eq!(restored.items()[0].cart_item_id, id);
        assert_eq!(restored.total_price(), Money::brl(79980));
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let line = LocalCartItem {
            sneaker_id: Some("s1".into()),
            cart_item_id: Some(CartItemId::new("c1")),
            ..Default::default()
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["sneakerId"], "s1");
        assert_eq!(json["cartItemId"], "c1");
    }

    #[test]
    fn test_restore_repairs_and_drops_lines() {
        let store = store();
        store
            .save(&LocalCart {
                items: vec![
                    // zero price: floor price applies
                    LocalCartItem {
                        sneaker_id: Some("s1".into()),
                        variant_id: Some("v1".into()),
                        quantity: Some(1),
                        price: Some(Money::brl(0)),
                        ..Default::default()
                    },
                    // no sneaker id: dropped
                    LocalCartItem {
                        variant_id: Some("v2".into()),
                        quantity: Some(1),
                        ..Default::default()
                    },
                ],
                applied_coupon: None,
            })
            .unwrap();

        let cart = store.restore(&IntegrityValidator::default()).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].price, Money::brl(100));
    }

    #[test]
    fn test_restore_folds_duplicate_keys() {
        let store = store();
        let record = |id: &str, quantity| LocalCartItem {
            cart_item_id: Some(CartItemId::new(id)),
            sneaker_id: Some("old-skool".into()),
            variant_id: Some("os-39".into()),
            size: Some("39".into()),
            color: Some("black".into()),
            quantity: Some(quantity),
            price: Some(Money::brl(39990)),
            ..Default::default()
        };
        store
            .save(&LocalCart {
                items: vec![record("c1", 1), record("c2", 2)],
                applied_coupon: None,
            })
            .unwrap();

        let cart = store.restore(&IntegrityValidator::default()).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].cart_item_id, CartItemId::new("c1"));
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.total_price(), Money::brl(119970));
    }

    #[test]
    fn test_parked_lines_belong_to_one_user() {
        let store = store();
        let ana = UserId::new("ana");
        store
            .save(&LocalCart {
                items: vec![LocalCartItem {
                    sneaker_id: Some("s1".into()),
                    ..Default::default()
                }],
                applied_coupon: None,
            })
            .unwrap();

        assert_eq!(store.park_for(&ana).unwrap(), 1);
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.reclaim_for(&UserId::new("bruno")).unwrap(), 0);
        assert!(store.load().unwrap().is_empty());

        assert_eq!(store.reclaim_for(&ana).unwrap(), 1);
        assert_eq!(store.load().unwrap().len(), 1);
        assert!(store.parked(&ana).unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let store = store();
        store
            .save(&LocalCart {
                items: vec![LocalCartItem::default()],
                applied_coupon: None,
            })
            .unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
