//! Price a checkout under every payment method.

use anyhow::{Context as _, Result};
use kickstore_commerce::checkout::{quote, CheckoutQuote};
use kickstore_commerce::coupon::CouponValue;
use kickstore_commerce::payment::PaymentMethod;
use kickstore_commerce::Rate;
use serde::Serialize;

use super::{parse_amount, QuoteArgs};
use crate::context::Context;

const METHODS: [PaymentMethod; 3] = [
    PaymentMethod::Pix,
    PaymentMethod::Boleto,
    PaymentMethod::CreditCard,
];

#[derive(Serialize)]
struct MethodQuote {
    method: PaymentMethod,
    #[serde(flatten)]
    quote: CheckoutQuote,
}

/// Run the quote command.
pub async fn run(args: QuoteArgs, ctx: &Context) -> Result<()> {
    let currency = ctx.config.pricing.currency()?;
    let subtotal = parse_amount(&args.subtotal, currency).context("Invalid subtotal")?;
    let shipping = parse_amount(&args.shipping, currency).context("Invalid shipping")?;

    let coupon = match (args.coupon_percent, args.coupon_fixed.as_deref()) {
        (Some(percent), _) => Some(CouponValue::Percentage(Rate::percent(percent.min(100)))),
        (None, Some(amount)) => Some(CouponValue::Fixed(
            parse_amount(amount, currency).context("Invalid coupon amount")?,
        )),
        (None, None) => None,
    };

    let pix_rate = ctx.config.payments.pix_discount();
    let quotes = METHODS
        .iter()
        .map(|&method| {
            quote(subtotal, shipping, coupon.as_ref(), method, pix_rate)
                .map(|quote| MethodQuote { method, quote })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ctx.output.is_json() {
        ctx.output.json(&quotes);
        return Ok(());
    }

    ctx.output.header("Checkout quote");
    ctx.output.kv("subtotal", &subtotal.display());
    ctx.output.kv("shipping", &shipping.display());
    ctx.output.kv("pix discount", &pix_rate.to_string());
    ctx.output.info("");

    let widths = [12, 12, 12, 12];
    ctx.output
        .table_row(&["method", "coupon", "payment", "total"], &widths);
    for entry in &quotes {
        let coupon = entry.quote.coupon_discount.display();
        let payment = entry.quote.payment_discount.display();
        let total = entry.quote.total.display();
        ctx.output.table_row(
            &[
                entry.method.display_name(),
                coupon.as_str(),
                payment.as_str(),
                total.as_str(),
            ],
            &widths,
        );
    }

    Ok(())
}
