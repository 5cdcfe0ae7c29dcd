//! CLI command implementations.

pub mod config;
pub mod demo;
pub mod quote;

use anyhow::{bail, Result};
use clap::{Args, Subcommand, ValueEnum};
use kickstore_commerce::payment::PaymentMethod;
use kickstore_commerce::{Currency, Money};

/// Arguments for the quote command.
#[derive(Args)]
pub struct QuoteArgs {
    /// Cart subtotal, e.g. `300` or `299.90`.
    pub subtotal: String,

    /// Shipping cost.
    #[arg(short, long, default_value = "0")]
    pub shipping: String,

    /// Percentage coupon, e.g. `10` for 10%.
    #[arg(long, conflicts_with = "coupon_fixed")]
    pub coupon_percent: Option<u32>,

    /// Fixed-amount coupon.
    #[arg(long)]
    pub coupon_fixed: Option<String>,
}

/// Payment method choice on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Pix,
    Boleto,
    Card,
}

impl From<MethodArg> for PaymentMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Pix => PaymentMethod::Pix,
            MethodArg::Boleto => PaymentMethod::Boleto,
            MethodArg::Card => PaymentMethod::CreditCard,
        }
    }
}

/// Arguments for the demo command.
#[derive(Args)]
pub struct DemoArgs {
    /// Payment method for the order.
    #[arg(short, long, value_enum, default_value_t = MethodArg::Pix)]
    pub method: MethodArg,

    /// Apply the SNEAKER10 coupon before checkout.
    #[arg(long)]
    pub coupon: bool,

    /// Decline the first card attempt, then retry with a good card.
    #[arg(long)]
    pub decline_first: bool,

    /// Let the PIX or Boleto payment expire instead of settling it.
    #[arg(long)]
    pub expire: bool,

    /// Shopper that signs in mid-scenario.
    #[arg(long, default_value = "demo-shopper")]
    pub user: String,

    /// Talk to the storefront API from the config instead of in-memory collaborators.
    #[arg(long)]
    pub remote: bool,

    /// Bearer token for `--remote`.
    #[arg(long, requires = "remote")]
    pub token: Option<String>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration.
    Show,
    /// Write a default configuration file.
    Init {
        /// Target file (default: kickstore.toml).
        #[arg(default_value = "kickstore.toml")]
        path: String,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Check that the configuration is usable.
    Validate,
}

/// Parse a decimal amount such as `299.90` or `299,90` into minor units.
pub fn parse_amount(input: &str, currency: Currency) -> Result<Money> {
    let normalized = input.trim().replace(',', ".");
    let (whole, fraction) = match normalized.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (normalized.as_str(), ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        bail!("empty amount");
    }
    if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        bail!("invalid amount '{}': at most two decimal digits", input);
    }
    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid amount '{}'", input))?
    };
    if whole < 0 {
        bail!("amount must not be negative: {}", input);
    }
    let cents: i64 = format!("{:0<2}", fraction).parse().unwrap_or(0);
    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(cents))
        .map(|amount| Money::new(amount, currency))
        .ok_or_else(|| anyhow::anyhow!("amount too large: {}", input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        let brl = Currency::BRL;
        assert_eq!(parse_amount("300", brl).unwrap(), Money::brl(30000));
        assert_eq!(parse_amount("299.9", brl).unwrap(), Money::brl(29990));
        assert_eq!(parse_amount("299,90", brl).unwrap(), Money::brl(29990));
        assert_eq!(parse_amount(".5", brl).unwrap(), Money::brl(50));
        assert!(parse_amount("1.999", brl).is_err());
        assert!(parse_amount("-3", brl).is_err());
        assert!(parse_amount("abc", brl).is_err());
    }
}
