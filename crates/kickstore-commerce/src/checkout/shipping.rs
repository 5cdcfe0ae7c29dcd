//! Shipping options offered at the shipping step.

use crate::ids::ShippingMethodId;
use crate::money::Money;
use crate::payment::business_days_after;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Delivery promise in business days after dispatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryWindow {
    pub min_days: u32,
    pub max_days: u32,
}

impl DeliveryWindow {
    /// A window; bounds given in either order.
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            min_days: a.min(b),
            max_days: a.max(b),
        }
    }

    /// Latest expected arrival for a parcel dispatched on `dispatched`.
    pub fn arrives_by(&self, dispatched: NaiveDate) -> NaiveDate {
        business_days_after(dispatched, self.max_days)
    }

    pub fn label(&self) -> String {
        if self.min_days == self.max_days {
            format!("{} business days", self.max_days)
        } else {
            format!("{}-{} business days", self.min_days, self.max_days)
        }
    }
}

/// A carrier service the shopper can pick (SEDEX, PAC, store pickup...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingMethod {
    pub id: ShippingMethodId,
    pub name: String,
    pub carrier: Option<String>,
    pub price: Money,
    pub window: Option<DeliveryWindow>,
}

impl ShippingMethod {
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        Self {
            id: ShippingMethodId::generate(),
            name: name.into(),
            carrier: None,
            price,
            window: None,
        }
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }

    pub fn with_delivery_days(mut self, min: u32, max: u32) -> Self {
        self.window = Some(DeliveryWindow::new(min, max));
        self
    }

    pub fn delivery_estimate(&self) -> Option<String> {
        self.window.as_ref().map(DeliveryWindow::label)
    }

    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}

/// The shipping choice frozen onto a checkout and its order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingSelection {
    pub method_id: ShippingMethodId,
    pub method_name: String,
    /// Amount charged; feeds the quote as `shipping`.
    pub rate: Money,
    pub carrier: Option<String>,
    pub window: Option<DeliveryWindow>,
}

impl ShippingSelection {
    pub fn from_method(method: &ShippingMethod) -> Self {
        Self {
            method_id: method.id.clone(),
            method_name: method.name.clone(),
            rate: method.price,
            carrier: method.carrier.clone(),
            window: method.window,
        }
    }

    pub fn delivery_estimate(&self) -> Option<String> {
        self.window.as_ref().map(DeliveryWindow::label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_freezes_method() {
        let method = ShippingMethod::new("SEDEX", Money::brl(3590))
            .with_carrier("Correios")
            .with_delivery_days(3, 1);

        let selection = ShippingSelection::from_method(&method);
        assert_eq!(selection.rate, Money::brl(3590));
        assert_eq!(selection.carrier.as_deref(), Some("Correios"));
        assert_eq!(selection.delivery_estimate().as_deref(), Some("1-3 business days"));
        assert!(!method.is_free());
    }

    #[test]
    fn test_arrival_skips_weekend() {
        // Friday dispatch, two business days: Tuesday.
        let friday = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let window = DeliveryWindow::new(2, 2);
        assert_eq!(window.arrives_by(friday), NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(window.label(), "2 business days");
    }

    #[test]
    fn test_store_pickup_is_free() {
        let method = ShippingMethod::new("Retirada na loja", Money::brl(0));
        assert!(method.is_free());
        assert_eq!(method.delivery_estimate(), None);
    }
}
