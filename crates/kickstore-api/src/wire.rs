//! JSON shapes exchanged with the storefront API.
//!
//! Money travels as decimal reais; everything in the domain is integer
//! centavos, so conversion happens here and nowhere else.

use kickstore_commerce::cart::{Cart, CartItem, CartOwner, NewCartItem};
use kickstore_commerce::catalog::{CompositeVariantKey, VariantRef};
use kickstore_commerce::coupon::{AppliedCoupon, CouponValue};
use kickstore_commerce::ids::{CartId, CartItemId, SneakerId, UserId, VariantId};
use kickstore_commerce::{CommerceError, Currency, Money, Rate};
use serde::{Deserialize, Serialize};

pub fn to_reais(money: &Money) -> f64 {
    money.amount_cents as f64 / 100.0
}

pub fn from_reais(amount: f64, currency: Currency) -> Money {
    Money::new((amount * 100.0).round() as i64, currency)
}

/// A server cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    pub cart_item_id: String,
    pub sneaker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub quantity: i64,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_at_time_of_addition: Option<f64>,
    pub name: String,
    pub size: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub discount: f64,
    /// Derived by the server; recomputed locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_price: Option<f64>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub out_of_stock_notified: bool,
}

fn default_true() -> bool {
    true
}

/// A server cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub items: Vec<CartItemDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_coupon: Option<CouponRefDto>,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub final_price: f64,
}

/// Coupon attached to a server cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRefDto {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// `POST /carts` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemBody {
    pub sneaker_id: String,
    pub variant_id: String,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    pub price: f64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl From<&NewCartItem> for AddItemBody {
    fn from(item: &NewCartItem) -> Self {
        Self {
            sneaker_id: item.sneaker_id.to_string(),
            variant_id: item.variant.wire_key(),
            size: item.size.clone(),
            color: item.color.clone(),
            quantity: item.quantity,
            price: to_reais(&item.price),
            name: item.name.clone(),
            brand: item.brand.clone(),
            image: item.image.clone(),
            slug: item.slug.clone(),
        }
    }
}

impl CouponRefDto {
    pub fn from_applied(coupon: &AppliedCoupon) -> Self {
        let (discount_type, discount_value) = match coupon.value {
            CouponValue::Percentage(rate) => (DiscountType::Percentage, rate.bps() as f64 / 100.0),
            CouponValue::Fixed(amount) => (DiscountType::Fixed, to_reais(&amount)),
        };
        Self {
            code: coupon.code.clone(),
            discount_type,
            discount_value,
        }
    }

    pub fn to_applied(&self, currency: Currency) -> AppliedCoupon {
        AppliedCoupon {
            code: self.code.clone(),
            value: coupon_value(self.discount_type, self.discount_value, currency),
        }
    }
}

pub(crate) fn coupon_value(kind: DiscountType, value: f64, currency: Currency) -> CouponValue {
    match kind {
        DiscountType::Percentage => {
            CouponValue::Percentage(Rate::from_bps((value * 100.0).round().max(0.0) as u32))
        }
        DiscountType::Fixed => CouponValue::Fixed(from_reais(value, currency)),
    }
}

/// Legacy composite keys round-trip as composite refs; anything else is canonical.
fn variant_ref(sneaker_id: &SneakerId, size: &str, color: &str, wire: Option<&str>) -> VariantRef {
    let composite = CompositeVariantKey::new(sneaker_id.clone(), size, color);
    match wire {
        Some(id) if !id.trim().is_empty() && id != composite.legacy_key() => {
            VariantRef::Canonical(VariantId::new(id))
        }
        _ => VariantRef::Composite(composite),
    }
}

impl CartItemDto {
    pub fn to_cart_item(&self, currency: Currency) -> CartItem {
        let sneaker_id = SneakerId::new(self.sneaker.as_str());
        let variant = variant_ref(&sneaker_id, &self.size, &self.color, self.variant.as_deref());
        let mut line = CartItem::with_id(
            CartItemId::new(self.cart_item_id.as_str()),
            NewCartItem {
                sneaker_id,
                variant,
                size: self.size.clone(),
                color: self.color.clone(),
                quantity: self.quantity,
                price: from_reais(self.price, currency),
                name: self.name.clone(),
                brand: self.brand.clone(),
                image: self.image.clone(),
                slug: self.slug.clone(),
            },
        );
        if let Some(original) = self.price_at_time_of_addition {
            line.price_at_time_of_addition = from_reais(original, currency);
        }
        line.discount = from_reais(self.discount, currency);
        line.is_available = self.is_available;
        line.out_of_stock_notified = self.out_of_stock_notified;
        line
    }
}

impl CartDto {
    /// Build the domain cart. Totals are recomputed, not trusted.
    pub fn into_cart(self, user_id: &UserId) -> Result<Cart, CommerceError> {
        let currency = Currency::default();
        let mut cart = Cart::new(CartOwner::User(user_id.clone()), currency);
        cart.id = CartId::new(self.id);
        for item in &self.items {
            cart.push_line(item.to_cart_item(currency))?;
        }
        if let Some(coupon) = &self.applied_coupon {
            cart.apply_coupon(coupon.to_applied(currency))?;
        }
        Ok(cart)
    }
}
