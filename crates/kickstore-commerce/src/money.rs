//! Money type for representing monetary values.
//!
//! Uses cents-based integer representation to avoid floating-point
//! precision issues that plague monetary calculations. Percentage
//! reductions are expressed as basis points and rounded half-up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    BRL,
    USD,
    EUR,
}

impl Currency {
    /// Get the currency code (e.g., "BRL").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::BRL => "BRL",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
        }
    }

    /// Get the currency symbol (e.g., "R$").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::BRL => "R$",
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
        }
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "BRL" => Some(Currency::BRL),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A rate in basis points (1/100 of a percent). `Rate::from_bps(500)` is 5%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Rate(u32);

impl Rate {
    /// Basis points in one whole.
    pub const WHOLE: u32 = 10_000;

    /// Create a rate from basis points, capped at 100%.
    pub fn from_bps(bps: u32) -> Self {
        Self(bps.min(Self::WHOLE))
    }

    /// Create a rate from whole percent points.
    pub fn percent(percent: u32) -> Self {
        Self::from_bps(percent.saturating_mul(100))
    }

    /// The rate in basis points.
    pub fn bps(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// A monetary value with currency.
///
/// Amounts are stored in the smallest unit of the currency (centavos for BRL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in smallest currency unit (e.g., centavos).
    pub amount_cents: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from cents.
    pub fn new(amount_cents: i64, currency: Currency) -> Self {
        Self {
            amount_cents,
            currency,
        }
    }

    /// Shorthand for a BRL amount in centavos.
    pub fn brl(amount_cents: i64) -> Self {
        Self::new(amount_cents, Currency::BRL)
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount_cents == 0
    }

    /// Check if this is positive.
    pub fn is_positive(&self) -> bool {
        self.amount_cents > 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.amount_cents < 0
    }

    /// Clamp negative amounts to zero.
    pub fn non_negative(&self) -> Self {
        Self::new(self.amount_cents.max(0), self.currency)
    }

    /// Format as a display string (e.g., "R$285.00").
    pub fn display(&self) -> String {
        let sign = if self.amount_cents < 0 { "-" } else { "" };
        let abs = self.amount_cents.unsigned_abs();
        format!(
            "{}{}{}.{:02}",
            sign,
            self.currency.symbol(),
            abs / 100,
            abs % 100
        )
    }

    /// Try to add another Money value, returning None on currency mismatch or overflow.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_cents
            .checked_add(other.amount_cents)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Try to subtract another Money value.
    pub fn try_subtract(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_cents
            .checked_sub(other.amount_cents)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Multiply by a scalar quantity.
    pub fn try_multiply(&self, factor: i64) -> Option<Money> {
        self.amount_cents
            .checked_mul(factor)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// The share of this amount given by `rate`, rounded half-up.
    pub fn portion(&self, rate: Rate) -> Money {
        let scaled = i128::from(self.amount_cents) * i128::from(rate.bps());
        let whole = i128::from(Rate::WHOLE);
        let half = whole / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / whole
        } else {
            (scaled - half) / whole
        };
        // |rounded| <= |amount_cents| because rate <= 100%.
        Money::new(rounded as i64, self.currency)
    }

    /// The smaller of two amounts in the same currency.
    pub fn min(&self, other: &Money) -> Money {
        if other.amount_cents < self.amount_cents {
            *other
        } else {
            *self
        }
    }

    /// Sum an iterator of Money values; None on currency mismatch or overflow.
    pub fn try_sum<'a>(mut iter: impl Iterator<Item = &'a Money>, currency: Currency) -> Option<Money> {
        iter.try_fold(Money::zero(currency), |acc, m| acc.try_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display() {
        assert_eq!(Money::brl(28500).display(), "R$285.00");
        assert_eq!(Money::brl(-5).display(), "-R$0.05");
        assert_eq!(Money::new(4999, Currency::USD).display(), "$49.99");
    }

    #[test]
    fn test_money_addition_rejects_mismatch() {
        let brl = Money::brl(1000);
        let usd = Money::new(1000, Currency::USD);
        assert_eq!(brl.try_add(&Money::brl(500)), Some(Money::brl(1500)));
        assert_eq!(brl.try_add(&usd), None);
    }

    #[test]
    fn test_money_overflow() {
        assert_eq!(Money::brl(i64::MAX).try_add(&Money::brl(1)), None);
        assert_eq!(Money::brl(i64::MAX).try_multiply(2), None);
    }

    #[test]
    fn test_portion_rounds_half_up() {
        // 5% of 320.00
        assert_eq!(Money::brl(32000).portion(Rate::percent(5)), Money::brl(1600));
        // 5% of 0.10 = 0.005 -> 0.01
        assert_eq!(Money::brl(10).portion(Rate::percent(5)), Money::brl(1));
        // 5% of 0.09 = 0.0045 -> 0.00
        assert_eq!(Money::brl(9).portion(Rate::percent(5)), Money::brl(0));
    }

    #[test]
    fn test_rate_capped_at_whole() {
        assert_eq!(Rate::from_bps(20_000).bps(), Rate::WHOLE);
        assert_eq!(Rate::percent(10).to_string(), "10.00%");
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(Money::brl(-300).non_negative(), Money::brl(0));
        assert_eq!(Money::brl(300).non_negative(), Money::brl(300));
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("brl"), Some(Currency::BRL));
        assert_eq!(Currency::from_code("JPY"), None);
    }
}
