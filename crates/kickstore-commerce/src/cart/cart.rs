//! Cart entity.

use crate::cart::{AvailabilityReport, CartItem, ItemKey, NewCartItem};
use crate::coupon::AppliedCoupon;
use crate::error::CommerceError;
use crate::ids::{CartId, CartItemId, UserId};
use crate::money::{Currency, Money};
use chrono::{DateTime, Utc};
use kickstore_cache::DeviceKey;
use serde::{Deserialize, Serialize};

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 99;

/// The single identity a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    /// Anonymous cart kept in the device-local cache.
    Device(DeviceKey),
    /// Server-persisted cart of an authenticated user.
    User(UserId),
}

impl CartOwner {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, CartOwner::User(_))
    }
}

/// Cart lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    #[default]
    Active,
    Abandoned,
    Converted,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Abandoned => "abandoned",
            CartStatus::Converted => "converted",
        }
    }
}

/// A shopping cart.
///
/// `total_price`, `discount` and `final_price` are derived from the current
/// lines and coupon on every mutation and cannot be set directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "CartDocument")]
pub struct Cart {
    /// Unique cart identifier.
    pub id: CartId,
    /// Owning identity.
    pub owner: CartOwner,
    items: Vec<CartItem>,
    applied_coupon: Option<AppliedCoupon>,
    total_price: Money,
    discount: Money,
    final_price: Money,
    /// Lifecycle status.
    pub status: CartStatus,
    /// Cart currency.
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Stored shape of a cart; derived totals are recomputed on load.
#[derive(Debug, Deserialize)]
struct CartDocument {
    id: CartId,
    owner: CartOwner,
    #[serde(default)]
    items: Vec<CartItem>,
    #[serde(default)]
    applied_coupon: Option<AppliedCoupon>,
    #[serde(default)]
    status: CartStatus,
    #[serde(default)]
    currency: Currency,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl TryFrom<CartDocument> for Cart {
    type Error = CommerceError;

    fn try_from(doc: CartDocument) -> Result<Self, Self::Error> {
        let mut cart = Cart {
            id: doc.id,
            owner: doc.owner,
            items: doc.items,
            applied_coupon: doc.applied_coupon,
            total_price: Money::zero(doc.currency),
            discount: Money::zero(doc.currency),
            final_price: Money::zero(doc.currency),
            status: doc.status,
            currency: doc.currency,
            created_at: doc.created_at,
            last_activity: doc.last_activity,
        };
        cart.recompute()?;
        Ok(cart)
    }
}

impl Cart {
    /// Create an empty cart for an owner.
    pub fn new(owner: CartOwner, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::generate(),
            owner,
            items: Vec::new(),
            applied_coupon: None,
            total_price: Money::zero(currency),
            discount: Money::zero(currency),
            final_price: Money::zero(currency),
            status: CartStatus::Active,
            currency,
            created_at: now,
            last_activity: now,
        }
    }

    /// Create an anonymous cart for a device.
    pub fn for_device(device: DeviceKey) -> Self {
        Self::new(CartOwner::Device(device), Currency::default())
    }

    /// Create a cart for an authenticated user.
    pub fn for_user(user_id: UserId) -> Self {
        Self::new(CartOwner::User(user_id), Currency::default())
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Sum of `price * quantity` over all lines.
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    /// Coupon discount against the current total.
    pub fn discount(&self) -> Money {
        self.discount
    }

    /// `max(0, total_price - discount)`.
    pub fn final_price(&self) -> Money {
        self.final_price
    }

    pub fn applied_coupon(&self) -> Option<&AppliedCoupon> {
        self.applied_coupon.as_ref()
    }

    pub fn applied_coupon_code(&self) -> Option<&str> {
        self.applied_coupon.as_ref().map(|c| c.code.as_str())
    }

    /// Add an item to the cart.
    ///
    /// A line with the same (sneaker, variant, size, color) key has its
    /// quantity incremented and its current price refreshed; otherwise a new
    /// line is appended with its addition-time price fixed.
    pub fn add_item(&mut self, item: NewCartItem) -> Result<CartItemId, CommerceError> {
        if item.quantity < 1 {
            return Err(CommerceError::InvalidQuantity(item.quantity));
        }
        if !item.price.is_positive() {
            return Err(CommerceError::UnresolvablePrice(item.sneaker_id.to_string()));
        }
        if item.price.currency != self.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: item.price.currency.code().to_string(),
            });
        }

        let key = item.key();
        let id = if let Some(existing) = self.items.iter_mut().find(|i| i.key() == key) {
            let new_quantity = existing
                .quantity
                .checked_add(item.quantity)
                .ok_or(CommerceError::Overflow)?;
            if new_quantity > MAX_QUANTITY_PER_ITEM {
                return Err(CommerceError::QuantityExceedsLimit(
                    new_quantity,
                    MAX_QUANTITY_PER_ITEM,
                ));
            }
            existing.quantity = new_quantity;
            existing.price = item.price;
            existing.recompute();
            existing.cart_item_id.clone()
        } else {
            if item.quantity > MAX_QUANTITY_PER_ITEM {
                return Err(CommerceError::QuantityExceedsLimit(
                    item.quantity,
                    MAX_QUANTITY_PER_ITEM,
                ));
            }
            let line = CartItem::from_new(item);
            let id = line.cart_item_id.clone();
            self.items.push(line);
            id
        };

        self.touch()?;
        Ok(id)
    }

    /// Insert a line keeping its identifier, as returned by the server.
    pub fn push_line(&mut self, line: CartItem) -> Result<(), CommerceError> {
        self.items.retain(|i| i.cart_item_id != line.cart_item_id);
        self.items.push(line);
        self.touch()
    }

    /// Remove a line. Returns false if no line has that id.
    pub fn remove_item(&mut self, cart_item_id: &CartItemId) -> Result<bool, CommerceError> {
        let len_before = self.items.len();
        self.items.retain(|i| &i.cart_item_id != cart_item_id);
        let removed = self.items.len() < len_before;
        if removed {
            self.touch()?;
        }
        Ok(removed)
    }

    /// Set a line's quantity. Quantities below one are rejected.
    pub fn update_quantity(
        &mut self,
        cart_item_id: &CartItemId,
        quantity: i64,
    ) -> Result<bool, CommerceError> {
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                quantity,
                MAX_QUANTITY_PER_ITEM,
            ));
        }

        match self.items.iter_mut().find(|i| &i.cart_item_id == cart_item_id) {
            Some(item) => {
                item.quantity = quantity;
                self.touch()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace a line's current reference price.
    pub fn update_price(
        &mut self,
        cart_item_id: &CartItemId,
        price: Money,
    ) -> Result<bool, CommerceError> {
        if !price.is_positive() {
            return Err(CommerceError::UnresolvablePrice(cart_item_id.to_string()));
        }
        match self.items.iter_mut().find(|i| &i.cart_item_id == cart_item_id) {
            Some(item) => {
                item.price = price;
                item.recompute();
                self.touch()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Empty the cart and drop any coupon.
    pub fn clear(&mut self) -> Result<(), CommerceError> {
        self.items.clear();
        self.applied_coupon = None;
        self.touch()
    }

    /// Attach a coupon; its discount follows the cart total from now on.
    pub fn apply_coupon(&mut self, coupon: AppliedCoupon) -> Result<(), CommerceError> {
        self.applied_coupon = Some(coupon);
        self.touch()
    }

    pub fn remove_coupon(&mut self) -> Result<bool, CommerceError> {
        let had = self.applied_coupon.take().is_some();
        if had {
            self.touch()?;
        }
        Ok(had)
    }

    /// Record the outcome of an availability check on each line.
    pub fn apply_availability(&mut self, report: &AvailabilityReport) {
        for line in &mut self.items {
            if let Some(entry) = report.line(&line.cart_item_id) {
                line.is_available = entry.is_available();
                if !line.is_available {
                    line.out_of_stock_notified = true;
                }
            }
        }
    }

    /// Recompute derived totals from the current lines.
    pub fn recompute(&mut self) -> Result<(), CommerceError> {
        let mut total = Money::zero(self.currency);
        for item in &mut self.items {
            item.recompute();
            let line_total = item.line_total()?;
            total = total.try_add(&line_total).ok_or_else(|| {
                CommerceError::CurrencyMismatch {
                    expected: self.currency.code().to_string(),
                    got: line_total.currency.code().to_string(),
                }
            })?;
        }

        let discount = match &self.applied_coupon {
            Some(coupon) => coupon.value.discount_for(&total),
            None => Money::zero(self.currency),
        };

        self.total_price = total;
        self.discount = discount;
        self.final_price = total
            .try_subtract(&discount)
            .ok_or(CommerceError::Overflow)?
            .non_negative();
        Ok(())
    }

    fn touch(&mut self) -> Result<(), CommerceError> {
        self.recompute()?;
        self.last_activity = Utc::now();
        Ok(())
    }

    pub fn mark_converted(&mut self) {
        self.status = CartStatus::Converted;
        self.last_activity = Utc::now();
    }

    pub fn mark_abandoned(&mut self) {
        self.status = CartStatus::Abandoned;
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get an item by ID.
    pub fn get_item(&self, cart_item_id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.cart_item_id == cart_item_id)
    }

    /// Get an item by composite key.
    pub fn find_by_key(&self, key: &ItemKey) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VariantRef;
    use crate::coupon::CouponValue;
    use crate::ids::{SneakerId, VariantId};
    use crate::money::Rate;

    fn item(variant: &str, quantity: i64, price: i64) -> NewCartItem {
        NewCartItem {
            sneaker_id: SneakerId::new("air-max-90"),
            variant: VariantRef::Canonical(VariantId::new(variant)),
            size: "42".into(),
            color: "white".into(),
            quantity,
            price: Money::brl(price),
            name: "Air Max 90".into(),
            brand: Some("Nike".into()),
            image: None,
            slug: Some("air-max-90".into()),
        }
    }

    fn cart() -> Cart {
        Cart::for_user(UserId::new("user-1"))
    }

    #[test]
    fn test_cart_creation() {
        let cart = cart();
        assert!(cart.is_empty());
        assert_eq!(cart.status, CartStatus::Active);
        assert!(cart.owner.is_authenticated());
        assert_eq!(cart.total_price(), Money::brl(0));
    }

    #[test]
    fn test_same_key_merges_into_one_line() {
        let mut cart = cart();
        let a = cart.add_item(item("v1", 1, 10000)).unwrap();
        let b = cart.add_item(item("v1", 2, 10000)).unwrap();
        let c = cart.add_item(item("v1", 4, 10000)).unwrap();

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 7);
        assert_eq!(cart.total_price(), Money::brl(70000));
    }

    #[test]
    fn test_price_snapshot_is_fixed_at_insertion() {
        let mut cart = cart();
        cart.add_item(item("v1", 1, 10000)).unwrap();
        cart.add_item(item("v1", 1, 12000)).unwrap();

        let line = &cart.items()[0];
        assert_eq!(line.price, Money::brl(12000));
        assert_eq!(line.price_at_time_of_addition, Money::brl(10000));
        assert_eq!(cart.total_price(), Money::brl(24000));
    }

    #[test]
    fn test_different_size_is_a_new_line() {
        let mut cart = cart();
        cart.add_item(item("v1", 1, 10000)).unwrap();
        let mut other = item("v1", 1, 10000);
        other.size = "43".into();
        cart.add_item(other).unwrap();
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_totals_follow_every_mutation() {
        let mut cart = cart();
        let a = cart.add_item(item("v1", 2, 10000)).unwrap();
        let b = cart.add_item(item("v2", 1, 5000)).unwrap();
        assert_eq!(cart.total_price(), Money::brl(25000));

        cart.update_quantity(&a, 1).unwrap();
        assert_eq!(cart.total_price(), Money::brl(15000));

        assert!(cart.remove_item(&b).unwrap());
        assert_eq!(cart.total_price(), Money::brl(10000));

        cart.clear().unwrap();
        assert_eq!(cart.total_price(), Money::brl(0));
        assert_eq!(cart.final_price(), Money::brl(0));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut cart = cart();
        cart.add_item(item("v1", 3, 3333)).unwrap();
        cart.apply_coupon(AppliedCoupon {
            code: "TEN".into(),
            value: CouponValue::Percentage(Rate::percent(10)),
        })
        .unwrap();

        cart.recompute().unwrap();
        let first = (cart.total_price(), cart.discount(), cart.final_price());
        cart.recompute().unwrap();
        let second = (cart.total_price(), cart.discount(), cart.final_price());
        assert_eq!(first, second);
    }

    #[test]
    fn test_final_price_never_negative() {
        let mut cart = cart();
        cart.add_item(item("v1", 1, 5000)).unwrap();
        cart.apply_coupon(AppliedCoupon {
            code: "HUGE".into(),
            value: CouponValue::Fixed(Money::brl(90000)),
        })
        .unwrap();
        assert_eq!(cart.final_price(), Money::brl(0));
        assert!(!cart.final_price().is_negative());
    }

    #[test]
    fn test_update_quantity_rejects_below_one() {
        let mut cart = cart();
        let id = cart.add_item(item("v1", 2, 1000)).unwrap();
        assert!(matches!(
            cart.update_quantity(&id, 0),
            Err(CommerceError::InvalidQuantity(0))
        ));
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_missing_line_is_a_noop() {
        let mut cart = cart();
        let missing = CartItemId::new("missing");
        assert!(!cart.remove_item(&missing).unwrap());
        assert!(!cart.update_quantity(&missing, 3).unwrap());
    }

    #[test]
    fn test_zero_price_rejected() {
        let mut cart = cart();
        assert!(matches!(
            cart.add_item(item("v1", 1, 0)),
            Err(CommerceError::UnresolvablePrice(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_limit() {
        let mut cart = cart();
        cart.add_item(item("v1", MAX_QUANTITY_PER_ITEM, 1000)).unwrap();
        assert!(matches!(
            cart.add_item(item("v1", 1, 1000)),
            Err(CommerceError::QuantityExceedsLimit(..))
        ));
    }

    #[test]
    fn test_clear_drops_coupon() {
        let mut cart = cart();
        cart.add_item(item("v1", 1, 1000)).unwrap();
        cart.apply_coupon(AppliedCoupon {
            code: "X".into(),
            value: CouponValue::Fixed(Money::brl(100)),
        })
        .unwrap();
        assert_eq!(cart.discount(), Money::brl(100));

        cart.clear().unwrap();
        assert!(cart.applied_coupon_code().is_none());
        assert_eq!(cart.discount(), Money::brl(0));
    }

    #[test]
    fn test_deserialize_recomputes_totals() {
        let mut cart = cart();
        cart.add_item(item("v1", 2, 1500)).unwrap();
        let mut json = serde_json::to_value(&cart).unwrap();
        json["total_price"] = serde_json::json!({"amount_cents": 1, "currency": "BRL"});

        let loaded: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(loaded.total_price(), Money::brl(3000));
    }
}
