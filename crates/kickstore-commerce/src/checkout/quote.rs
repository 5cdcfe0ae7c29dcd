//! Checkout price breakdown.

use crate::coupon::CouponValue;
use crate::error::CommerceError;
use crate::money::{Money, Rate};
use crate::payment::PaymentMethod;
use serde::{Deserialize, Serialize};

/// Totals for a checkout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutQuote {
    /// Sum of line totals.
    pub subtotal: Money,
    /// Selected shipping cost.
    pub shipping: Money,
    /// Coupon reduction.
    pub coupon_discount: Money,
    /// Payment method reduction (PIX).
    pub payment_discount: Money,
    /// `coupon_discount + payment_discount`.
    pub discount_total: Money,
    /// `subtotal + shipping - discount_total`.
    pub total: Money,
}

/// Price a checkout.
///
/// The coupon applies to `subtotal + shipping` first. A PIX payment then takes
/// `pix_rate` off what remains. The two reductions are applied one after the
/// other, never folded into a single rate.
pub fn quote(
    subtotal: Money,
    shipping: Money,
    coupon: Option<&CouponValue>,
    method: PaymentMethod,
    pix_rate: Rate,
) -> Result<CheckoutQuote, CommerceError> {
    let currency_mismatch = || CommerceError::CurrencyMismatch {
        expected: subtotal.currency.code().to_string(),
        got: shipping.currency.code().to_string(),
    };
    let gross = subtotal.try_add(&shipping).ok_or_else(currency_mismatch)?;

    let coupon_discount = coupon
        .map(|c| c.discount_for(&gross))
        .unwrap_or_else(|| Money::zero(gross.currency));
    let after_coupon = gross
        .try_subtract(&coupon_discount)
        .ok_or(CommerceError::Overflow)?
        .non_negative();

    let payment_discount = match method {
        PaymentMethod::Pix => after_coupon.portion(pix_rate),
        PaymentMethod::Boleto | PaymentMethod::CreditCard => Money::zero(gross.currency),
    };

    let discount_total = coupon_discount
        .try_add(&payment_discount)
        .ok_or(CommerceError::Overflow)?;
    let total = gross
        .try_subtract(&discount_total)
        .ok_or(CommerceError::Overflow)?
        .non_negative();

    Ok(CheckoutQuote {
        subtotal,
        shipping,
        coupon_discount,
        payment_discount,
        discount_total,
        total,
    })
}
