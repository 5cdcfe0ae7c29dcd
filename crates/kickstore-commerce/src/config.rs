//! Storefront configuration.

use crate::error::CommerceError;
use crate::money::{Currency, Money, Rate};
use crate::payment::PaymentSettings;
use crate::validation::DEFAULT_FLOOR_PRICE_CENTS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file for the commerce core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommerceConfig {
    /// Pricing rules.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Payment method settings.
    #[serde(default)]
    pub payments: PaymentsConfig,

    /// Storefront API.
    #[serde(default)]
    pub api: ApiConfig,

    /// Device cache.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl CommerceConfig {
    /// Load config from a file: JSON when the path ends in `.json`, TOML otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CommerceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CommerceError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        if is_json(path) {
            serde_json::from_str(&content).map_err(|e| {
                CommerceError::Config(format!("failed to parse JSON config {}: {}", path.display(), e))
            })
        } else {
            toml::from_str(&content).map_err(|e| {
                CommerceError::Config(format!("failed to parse TOML config {}: {}", path.display(), e))
            })
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CommerceError> {
        let path = path.as_ref();
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self).map_err(|e| CommerceError::Config(e.to_string()))?
        };

        std::fs::write(path, content).map_err(|e| {
            CommerceError::Config(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Pricing rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    /// ISO currency code.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Last-resort unit price, in cents.
    #[serde(default = "default_floor_price")]
    pub floor_price_cents: i64,
}

fn default_currency() -> String {
    Currency::BRL.code().to_string()
}

fn default_floor_price() -> i64 {
    DEFAULT_FLOOR_PRICE_CENTS
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            floor_price_cents: default_floor_price(),
        }
    }
}

impl PricingConfig {
    pub fn currency(&self) -> Result<Currency, CommerceError> {
        Currency::from_code(&self.currency)
            .ok_or_else(|| CommerceError::Config(format!("unknown currency: {}", self.currency)))
    }

    pub fn floor_price(&self) -> Result<Money, CommerceError> {
        if self.floor_price_cents <= 0 {
            return Err(CommerceError::Config(format!(
                "floor_price_cents must be positive, got {}",
                self.floor_price_cents
            )));
        }
        Ok(Money::new(self.floor_price_cents, self.currency()?))
    }
}

/// Payment method settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentsConfig {
    /// PIX discount in basis points.
    #[serde(default = "default_pix_discount")]
    pub pix_discount_bps: u32,

    /// Minutes before a PIX QR code expires.
    #[serde(default = "default_pix_expiry")]
    pub pix_expiry_minutes: i64,

    /// Business days until a boleto is due.
    #[serde(default = "default_boleto_days")]
    pub boleto_due_business_days: u32,
}

fn default_pix_discount() -> u32 {
    500
}

fn default_pix_expiry() -> i64 {
    30
}

fn default_boleto_days() -> u32 {
    3
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            pix_discount_bps: default_pix_discount(),
            pix_expiry_minutes: default_pix_expiry(),
            boleto_due_business_days: default_boleto_days(),
        }
    }
}

impl PaymentsConfig {
    pub fn pix_discount(&self) -> Rate {
        Rate::from_bps(self.pix_discount_bps)
    }

    pub fn settings(&self) -> PaymentSettings {
        PaymentSettings {
            pix_expiry_minutes: self.pix_expiry_minutes,
            boleto_due_business_days: self.boleto_due_business_days,
        }
    }
}

/// Storefront API endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Device cache location. `None` keeps it in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
