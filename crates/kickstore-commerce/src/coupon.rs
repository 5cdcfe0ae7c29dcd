//! Coupon types and validation.

use crate::error::CommerceError;
use crate::ids::CouponId;
use crate::money::{Money, Rate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value of a coupon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CouponValue {
    /// Percentage off.
    Percentage(Rate),
    /// Fixed amount off.
    Fixed(Money),
}

impl CouponValue {
    /// Discount for a given base amount, never exceeding the base.
    pub fn discount_for(&self, base: &Money) -> Money {
        if !base.is_positive() {
            return Money::zero(base.currency);
        }
        match self {
            CouponValue::Percentage(rate) => base.portion(*rate),
            CouponValue::Fixed(amount) => amount.min(base).non_negative(),
        }
    }
}

/// A coupon as returned by the validation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    pub id: CouponId,
    /// Coupon code (e.g., "SNEAKER10").
    pub code: String,
    pub value: CouponValue,
    /// Minimum cart total for the coupon to apply.
    pub minimum_purchase: Option<Money>,
    /// Maximum number of uses (None = unlimited).
    pub usage_limit: Option<u32>,
    pub usage_count: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl Coupon {
    /// Create a new percentage coupon.
    pub fn percentage(code: impl Into<String>, rate: Rate) -> Self {
        Self::with_value(code, CouponValue::Percentage(rate))
    }

    /// Create a new fixed amount coupon.
    pub fn fixed_amount(code: impl Into<String>, amount: Money) -> Self {
        Self::with_value(code, CouponValue::Fixed(amount))
    }

    fn with_value(code: impl Into<String>, value: CouponValue) -> Self {
        Self {
            id: CouponId::generate(),
            code: normalize_code(&code.into()),
            value,
            minimum_purchase: None,
            usage_limit: None,
            usage_count: 0,
            expires_at: None,
            active: true,
        }
    }

    pub fn with_minimum_purchase(mut self, amount: Money) -> Self {
        self.minimum_purchase = Some(amount);
        self
    }

    pub fn with_usage_limit(mut self, limit: u32) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Check the coupon against a purchase amount at a point in time.
    pub fn check(&self, purchase: &Money, now: DateTime<Utc>) -> Result<(), CommerceError> {
        let reject = |reason: &str| {
            Err(CommerceError::InvalidCoupon {
                code: self.code.clone(),
                reason: reason.to_string(),
            })
        };

        if !self.active {
            return reject("inactive");
        }
        if self.expires_at.is_some_and(|at| now > at) {
            return reject("expired");
        }
        if self.usage_limit.is_some_and(|limit| self.usage_count >= limit) {
            return reject("usage limit reached");
        }
        if let Some(minimum) = &self.minimum_purchase {
            if purchase.amount_cents < minimum.amount_cents {
                return reject(&format!("minimum purchase is {}", minimum));
            }
        }
        Ok(())
    }
}

/// Coupon codes are matched case-insensitively.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A coupon attached to a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub code: String,
    pub value: CouponValue,
}

impl From<&Coupon> for AppliedCoupon {
    fn from(coupon: &Coupon) -> Self {
        Self {
            code: coupon.code.clone(),
            value: coupon.value,
        }
    }
}

/// `POST /coupons/code/:code/validate`.
#[async_trait]
pub trait CouponValidator: Send + Sync {
    /// Validate a code against a purchase amount; returns the coupon when it applies.
    async fn validate(&self, code: &str, purchase: &Money) -> Result<Coupon, CommerceError>;
}

/// In-memory coupon book for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryCoupons {
    coupons: RwLock<HashMap<String, Coupon>>,
}

impl InMemoryCoupons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, coupon: Coupon) {
        self.coupons.write().insert(coupon.code.clone(), coupon);
    }

    /// Count one redemption.
    pub fn record_usage(&self, code: &str) -> bool {
        match self.coupons.write().get_mut(&normalize_code(code)) {
            Some(coupon) => {
                coupon.usage_count += 1;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CouponValidator for InMemoryCoupons {
    async fn validate(&self, code: &str, purchase: &Money) -> Result<Coupon, CommerceError> {
        let code = normalize_code(code);
        let coupon = self
            .coupons
            .read()
            .get(&code)
            .cloned()
            .ok_or_else(|| CommerceError::InvalidCoupon {
                code: code.clone(),
                reason: "unknown code".to_string(),
            })?;
        coupon.check(purchase, Utc::now())?;
        Ok(coupon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_percentage_coupon() {
        let coupon = Coupon::percentage("save10", Rate::percent(10));
        assert_eq!(coupon.code, "SAVE10");
        assert_eq!(coupon.value.discount_for(&Money::brl(32000)), Money::brl(3200));
    }

    #[test]
    fn test_fixed_coupon_capped_at_base() {
        let value = CouponValue::Fixed(Money::brl(10000));
        assert_eq!(value.discount_for(&Money::brl(5000)), Money::brl(5000));
        assert_eq!(value.discount_for(&Money::brl(0)), Money::brl(0));
    }

    #[test]
    fn test_coupon_checks() {
        let now = Utc::now();
        let purchase = Money::brl(10000);

        let coupon = Coupon::percentage("A", Rate::percent(5)).with_minimum_purchase(Money::brl(20000));
        assert!(coupon.check(&purchase, now).is_err());

        let coupon = Coupon::percentage("B", Rate::percent(5)).expiring_at(now - Duration::hours(1));
        assert!(coupon.check(&purchase, now).is_err());

        let mut coupon = Coupon::percentage("C", Rate::percent(5)).with_usage_limit(1);
        assert!(coupon.check(&purchase, now).is_ok());
        coupon.usage_count = 1;
        assert!(coupon.check(&purchase, now).is_err());

        let mut coupon = Coupon::percentage("D", Rate::percent(5));
        coupon.active = false;
        assert!(coupon.check(&purchase, now).is_err());
    }

    #[tokio::test]
    async fn test_in_memory_validation() {
        let book = InMemoryCoupons::new();
        book.insert(Coupon::percentage("KICKS10", Rate::percent(10)).with_usage_limit(1));

        let coupon = book.validate(" kicks10 ", &Money::brl(100)).await.unwrap();
        assert_eq!(coupon.code, "KICKS10");

        assert!(book.record_usage("kicks10"));
        let err = book.validate("KICKS10", &Money::brl(100)).await.unwrap_err();
        assert!(matches!(err, CommerceError::InvalidCoupon { .. }));

        let err = book.validate("NOPE", &Money::brl(100)).await.unwrap_err();
        assert!(err.to_string().contains("unknown code"));
    }
}
