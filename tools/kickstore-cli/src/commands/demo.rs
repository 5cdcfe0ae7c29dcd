//! Storefront scenario: guest cart, sign-in merge, checkout and payment.

use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use chrono::Utc;
use kickstore_api::HttpBackend;
use kickstore_cache::{Cache, DeviceKey};
use kickstore_commerce::catalog::{InMemoryCatalog, SneakerSummary, Variant};
use kickstore_commerce::checkout::{
    Address, CheckoutOrchestrator, InMemoryOrders, Order, OrderRepository, ShippingMethod,
    ShippingSelection,
};
use kickstore_commerce::coupon::{Coupon, CouponValidator, InMemoryCoupons};
use kickstore_commerce::events::{CommerceEvent, EventBus};
use kickstore_commerce::payment::{
    BoletoWebhook, CardToken, PaymentAdapters, PaymentArtifact, PaymentGateway, PaymentMethod,
    PaymentStatus, SandboxGateway, SANDBOX_DECLINE_PREFIX,
};
use kickstore_commerce::sync::{
    CartApi, CartSession, InMemoryCartServer, LocalCartStore, MergeOutcome, SessionDeps,
};
use kickstore_commerce::validation::{CartLineRequest, IntegrityValidator};
use kickstore_commerce::{Money, OrderId, Rate, SneakerId, UserId};
use serde::Serialize;
use tokio::sync::broadcast;

use super::DemoArgs;
use crate::context::Context;
use crate::output::{order_badge, payment_badge};

const STEPS: usize = 6;
const DEVICE_KEY: &str = "device";
const DEMO_COUPON: &str = "SNEAKER10";

/// Collaborators behind the session and the orchestrator.
struct Backend {
    carts: Arc<dyn CartApi>,
    orders: Arc<dyn OrderRepository>,
    coupons: Arc<dyn CouponValidator>,
    gateway: Arc<dyn PaymentGateway>,
    /// Set when payments can be settled or expired on demand.
    sandbox: Option<Arc<SandboxGateway>>,
}

impl Backend {
    fn in_memory() -> Self {
        let coupons = InMemoryCoupons::new();
        coupons.insert(Coupon::percentage(DEMO_COUPON, Rate::percent(10)));
        let sandbox = Arc::new(SandboxGateway::new());
        Self {
            carts: Arc::new(InMemoryCartServer::new()),
            orders: Arc::new(InMemoryOrders::new()),
            coupons: Arc::new(coupons),
            gateway: sandbox.clone(),
            sandbox: Some(sandbox),
        }
    }

    fn remote(ctx: &Context, token: Option<&str>) -> Result<Self> {
        let mut http = HttpBackend::from_config(&ctx.config.api)
            .with_context(|| format!("Invalid API config: {}", ctx.config.api.base_url))?;
        if let Some(token) = token {
            http = http.with_bearer_token(token);
        }
        Ok(Self {
            carts: http.carts,
            orders: http.orders,
            coupons: http.coupons,
            gateway: http.payments,
            sandbox: None,
        })
    }
}

#[derive(Serialize)]
struct DemoSummary {
    order: Order,
    payment_status: PaymentStatus,
    cart_lines_after: usize,
    orders_in_history: usize,
    events: Vec<CommerceEvent>,
}

/// Run the demo command.
pub async fn run(args: DemoArgs, ctx: &Context) -> Result<()> {
    let backend = if args.remote {
        Backend::remote(ctx, args.token.as_deref())?
    } else {
        Backend::in_memory()
    };

    let catalog = Arc::new(demo_catalog());
    let events = EventBus::default();
    let mut feed = events.subscribe();

    let cache = open_cache(ctx)?;
    let device = device_key(&cache)?;
    ctx.output.debug(&format!("device key {}", device));

    let deps = SessionDeps {
        api: backend.carts.clone(),
        catalog: catalog.clone(),
        coupons: backend.coupons.clone(),
        validator: IntegrityValidator::new(ctx.config.pricing.floor_price()?),
        events: events.clone(),
    };
    let session = Arc::new(CartSession::restore(LocalCartStore::new(cache, device), deps)?);
    let checkout = CheckoutOrchestrator::new(
        session.clone(),
        backend.orders.clone(),
        PaymentAdapters::new(backend.gateway.clone(), ctx.config.payments.settings()),
        ctx.config.payments.pix_discount(),
    );

    // 1. Guest cart.
    ctx.output.step(1, STEPS, "Filling a guest cart");
    session
        .add_item(&demo_line("air-max-90", "42", "white", 1, Some(Money::brl(69990))))
        .await?;
    // No price on the request: resolved from the catalog reference price.
    let cart = session
        .add_item(&demo_line("dunk-low", "41", "panda", 2, None))
        .await?;
    ctx.output
        .kv("guest cart", &format!("{} item(s), {}", cart.item_count(), cart.final_price()));

    // 2. Sign in.
    ctx.output.step(2, STEPS, &format!("Signing in as {}", args.user));
    match session.login(UserId::new(args.user.as_str())).await {
        Ok(MergeOutcome::Merged(report)) => {
            ctx.output.kv(
                "merge",
                &format!("{} of {} line(s) moved to the account", report.transferred, report.attempted),
            );
            for failure in &report.failed {
                ctx.output.warn(&format!(
                    "dropped {}: {}",
                    failure.line.sneaker_id.as_deref().unwrap_or("?"),
                    failure.reason
                ));
            }
        }
        Ok(outcome) => ctx.output.kv("merge", &format!("{:?}", outcome)),
        Err(e) => ctx
            .output
            .warn(&format!("merge failed, guest cart kept for next sign-in: {}", e)),
    }

    // 3. Coupon.
    ctx.output.step(3, STEPS, "Reviewing the cart");
    if args.coupon {
        let coupon = session.apply_coupon(DEMO_COUPON).await?;
        ctx.output.kv("coupon", &coupon.code);
    }
    let cart = session.cart();
    for line in cart.items() {
        ctx.output.list_item(&format!(
            "{} x{} ({} {}) {}",
            line.name, line.quantity, line.size, line.color, line.price
        ));
    }

    // 4. Checkout steps.
    let method = PaymentMethod::from(args.method);
    ctx.output
        .step(4, STEPS, &format!("Checking out with {}", method.display_name()));
    let mut flow = checkout.begin();
    checkout.advance(&mut flow).await?;
    flow.set_shipping_address(demo_address());
    flow.set_shipping_method(ShippingSelection::from_method(
        &ShippingMethod::new("SEDEX", Money::brl(2490))
            .with_carrier("Correios")
            .with_delivery_days(2, 4),
    ));
    flow.set_payment_method(method);
    checkout.advance(&mut flow).await?;

    let quote = checkout.quote(&flow, method)?;
    ctx.output.kv("subtotal", &quote.subtotal.display());
    ctx.output.kv("shipping", &quote.shipping.display());
    ctx.output.kv("discount", &quote.discount_total.display());
    ctx.output.kv("total", &quote.total.display());

    let order = checkout.submit(&mut flow).await?;
    ctx.output
        .success(&format!("Order {} created for {}", order.id, order.total_price()));

    // 5. Payment.
    ctx.output.step(5, STEPS, "Paying");
    let email = Some(format!("{}@example.com", args.user));
    let payment_status = match method {
        PaymentMethod::CreditCard => pay_by_card(&checkout, &order, email, args.decline_first, ctx).await?,
        PaymentMethod::Pix | PaymentMethod::Boleto => {
            let artifact = checkout.pay(&order.id, email, None).await?;
            describe_artifact(&artifact, ctx);
            settle_offline(&checkout, &backend, &order.id, &artifact, args.expire).await?
        }
    };
    ctx.output.kv("payment", &payment_badge(payment_status));

    // 6. Summary.
    ctx.output.step(6, STEPS, "Summary");
    let order = backend
        .orders
        .get(&order.id)
        .await?
        .ok_or_else(|| anyhow!("order {} vanished", order.id))?;
    let history = checkout.history(10)?;
    history.load_next().await?;
    let summary = DemoSummary {
        payment_status,
        cart_lines_after: session.cart().items().len(),
        orders_in_history: history.orders().len(),
        events: drain(&mut feed),
        order,
    };

    if ctx.output.is_json() {
        ctx.output.json(&summary);
        return Ok(());
    }

    ctx.output.kv("order", &order_badge(summary.order.status()));
    if let Some(reason) = summary.order.cancellation_reason() {
        ctx.output.kv("cancelled", reason);
    }
    ctx.output
        .kv("cart lines left", &summary.cart_lines_after.to_string());
    ctx.output
        .kv("orders in history", &summary.orders_in_history.to_string());
    ctx.output.info(&format!("{} event(s):", summary.events.len()));
    for event in &summary.events {
        ctx.output.list_item(&event_name(event));
    }
    Ok(())
}

async fn pay_by_card(
    checkout: &CheckoutOrchestrator,
    order: &Order,
    email: Option<String>,
    decline_first: bool,
    ctx: &Context,
) -> Result<PaymentStatus> {
    if decline_first {
        let refused = CardToken::new(format!("{SANDBOX_DECLINE_PREFIX}_demo"), "0002");
        match checkout.pay(&order.id, email.clone(), Some(refused)).await {
            Ok(artifact) => ctx
                .output
                .warn(&format!("expected a decline, got {}", artifact.initial_status().as_str())),
            Err(e) => ctx.output.warn(&format!("{} (retrying with another card)", e)),
        }
    }

    let mut card = CardToken::new("tok_visa_demo", "4242");
    card.brand = Some("visa".to_string());
    let artifact = checkout.pay(&order.id, email, Some(card)).await?;
    describe_artifact(&artifact, ctx);
    Ok(artifact.initial_status())
}

/// Settle or expire an offline payment, then poll it once.
async fn settle_offline(
    checkout: &CheckoutOrchestrator,
    backend: &Backend,
    order_id: &OrderId,
    artifact: &PaymentArtifact,
    expire: bool,
) -> Result<PaymentStatus> {
    let payment_id = artifact.payment_id();

    if let Some(sandbox) = &backend.sandbox {
        if expire {
            sandbox.expire(payment_id);
        } else if artifact.method() == PaymentMethod::Boleto {
            let webhook = BoletoWebhook {
                payment_id: payment_id.clone(),
                status: PaymentStatus::Approved,
                received_at: Utc::now(),
            };
            sandbox.settle(payment_id);
            return Ok(checkout.handle_boleto_webhook(order_id, &webhook).await?);
        } else {
            sandbox.settle(payment_id);
        }
    }

    Ok(checkout.verify_payment(order_id).await?)
}

fn describe_artifact(artifact: &PaymentArtifact, ctx: &Context) {
    match artifact {
        PaymentArtifact::Pix {
            qr_payload,
            expires_at,
            ..
        } => {
            ctx.output.kv("pix payload", qr_payload);
            ctx.output.kv("expires", &expires_at.to_rfc3339());
        }
        PaymentArtifact::Boleto {
            barcode, due_date, ..
        } => {
            ctx.output.kv("barcode", barcode);
            ctx.output.kv("due", &due_date.to_string());
        }
        PaymentArtifact::CreditCard {
            last_four, status, ..
        } => {
            ctx.output
                .kv("card", &format!("**** {} {}", last_four, status.as_str()));
        }
    }
}

fn drain(feed: &mut broadcast::Receiver<CommerceEvent>) -> Vec<CommerceEvent> {
    let mut events = Vec::new();
    loop {
        match feed.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event feed lagged");
            }
            Err(_) => return events,
        }
    }
}

fn event_name(event: &CommerceEvent) -> String {
    serde_json::to_value(event)
        .ok()
        .and_then(|v| v.get("event").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", event))
}

fn open_cache(ctx: &Context) -> Result<Cache> {
    match &ctx.config.cache.path {
        Some(path) => {
            let path = ctx.resolve_path(path);
            Cache::open(&path).with_context(|| format!("Failed to open cache {}", path.display()))
        }
        None => Ok(Cache::in_memory()),
    }
}

/// The device key survives between runs when the cache is file-backed.
fn device_key(cache: &Cache) -> Result<DeviceKey> {
    if let Some(key) = cache.get::<DeviceKey>(DEVICE_KEY)? {
        return Ok(key);
    }
    let key = DeviceKey::generate();
    cache.set(DEVICE_KEY, &key)?;
    Ok(key)
}

fn demo_catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();
    for (id, name, brand, price) in [
        ("air-max-90", "Air Max 90", "Nike", 69990),
        ("dunk-low", "Dunk Low", "Nike", 79990),
        ("samba-og", "Samba OG", "Adidas", 59990),
    ] {
        catalog.add_sneaker(SneakerSummary {
            id: SneakerId::new(id),
            name: name.to_string(),
            brand: brand.to_string(),
            slug: id.to_string(),
            image: None,
            price: Money::brl(price),
        });
    }
    catalog.add_variant(Variant::new("air-max-90-42-white", "air-max-90", "42", "white", 8));
    catalog.add_variant(Variant::new("dunk-low-41-panda", "dunk-low", "41", "panda", 3));
    catalog.add_variant(Variant::new("samba-og-40-black", "samba-og", "40", "black", 0));
    catalog
}

fn demo_line(
    sneaker: &str,
    size: &str,
    color: &str,
    quantity: i64,
    price: Option<Money>,
) -> CartLineRequest {
    CartLineRequest {
        sneaker_id: Some(sneaker.to_string()),
        variant_id: Some(format!("{sneaker}-{size}-{color}")),
        size: Some(size.to_string()),
        color: Some(color.to_string()),
        quantity: Some(quantity),
        price,
        name: Some(sneaker.replace('-', " ")),
        ..Default::default()
    }
}

fn demo_address() -> Address {
    Address::new(
        "Ana Souza",
        "Avenida Paulista",
        "1578",
        "Bela Vista",
        "São Paulo",
        "SP",
        "01310200",
    )
}
