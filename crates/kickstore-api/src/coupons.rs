//! `POST /coupons/code/:code/validate`.

use crate::wire::{coupon_value, from_reais, to_reais, DiscountType};
use crate::ApiClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kickstore_commerce::coupon::{normalize_code, Coupon, CouponValidator};
use kickstore_commerce::ids::CouponId;
use kickstore_commerce::{CommerceError, Money};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateBody {
    purchase_amount: f64,
}

/// A coupon as the API returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    #[serde(default)]
    pub minimum_purchase: Option<f64>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub usage_count: u32,
}

fn default_active() -> bool {
    true
}

impl CouponDto {
    pub fn into_coupon(self, purchase: &Money) -> Coupon {
        let currency = purchase.currency;
        Coupon {
            id: CouponId::new(self.id),
            code: normalize_code(&self.code),
            value: coupon_value(self.discount_type, self.discount_value, currency),
            minimum_purchase: self.minimum_purchase.map(|m| from_reais(m, currency)),
            usage_limit: self.usage_limit,
            usage_count: self.usage_count,
            expires_at: self.expires_at,
            active: self.is_active,
        }
    }
}

/// Coupon validation over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCoupons {
    client: ApiClient,
}

impl HttpCoupons {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub(crate) fn validate_path(code: &str) -> String {
        format!("/coupons/code/{}/validate", normalize_code(code))
    }
}

#[async_trait]
impl CouponValidator for HttpCoupons {
    async fn validate(&self, code: &str, purchase: &Money) -> Result<Coupon, CommerceError> {
        let body = ValidateBody {
            purchase_amount: to_reais(purchase),
        };
        let dto: CouponDto = match self.client.post(&Self::validate_path(code), &body).await {
            Ok(dto) => dto,
            Err(e) if e.status().is_some_and(|s| (400..500).contains(&s)) => {
                return Err(CommerceError::InvalidCoupon {
                    code: normalize_code(code),
                    reason: e.reason(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        // Re-checked against the local clock and purchase amount.
        let coupon = dto.into_coupon(purchase);
        coupon.check(purchase, Utc::now())?;
        Ok(coupon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kickstore_commerce::coupon::CouponValue;
    use kickstore_commerce::Rate;
    use serde_json::json;

    #[test]
    fn test_path_normalizes_code() {
        assert_eq!(
            HttpCoupons::validate_path(" sneaker10 "),
            "/coupons/code/SNEAKER10/validate"
        );
    }

    #[test]
    fn test_dto_maps_to_coupon() {
        let dto: CouponDto = serde_json::from_value(json!({
            "_id": "c1",
            "code": "sneaker10",
            "discountType": "percentage",
            "discountValue": 10,
            "minimumPurchase": 200,
            "isActive": true,
            "usageLimit": 100,
            "usageCount": 3
        }))
        .unwrap();
        let coupon = dto.into_coupon(&Money::brl(30000));

        assert_eq!(coupon.code, "SNEAKER10");
        assert_eq!(coupon.value, CouponValue::Percentage(Rate::percent(10)));
        assert_eq!(coupon.minimum_purchase, Some(Money::brl(20000)));
        assert!(coupon.check(&Money::brl(30000), Utc::now()).is_ok());
        assert!(coupon.check(&Money::brl(10000), Utc::now()).is_err());
    }

    #[test]
    fn test_inactive_flag_defaults_to_true() {
        let dto: CouponDto = serde_json::from_value(json!({
            "_id": "c2",
            "code": "FLAT50",
            "discountType": "fixed",
            "discountValue": 50
        }))
        .unwrap();
        let coupon = dto.into_coupon(&Money::brl(10000));
        assert!(coupon.active);
        assert_eq!(coupon.value, CouponValue::Fixed(Money::brl(5000)));
    }
}
