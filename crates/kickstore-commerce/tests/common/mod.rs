//! Shared storefront wiring for integration tests.
#![allow(dead_code)]

use kickstore_cache::{Cache, DeviceKey};
use kickstore_commerce::catalog::{InMemoryCatalog, Variant};
use kickstore_commerce::checkout::{
    Address, CheckoutFlow, CheckoutOrchestrator, InMemoryOrders, ShippingMethod, ShippingSelection,
};
use kickstore_commerce::coupon::InMemoryCoupons;
use kickstore_commerce::events::EventBus;
use kickstore_commerce::payment::{PaymentAdapters, PaymentMethod, PaymentSettings, SandboxGateway};
use kickstore_commerce::sync::{CartSession, InMemoryCartServer, LocalCartStore, SessionDeps};
use kickstore_commerce::validation::{CartLineRequest, IntegrityValidator};
use kickstore_commerce::{Money, Rate};
use std::sync::Arc;

pub const DEVICE: &str = "dev_integration";

pub struct Storefront {
    pub catalog: Arc<InMemoryCatalog>,
    pub server: Arc<InMemoryCartServer>,
    pub coupons: Arc<InMemoryCoupons>,
    pub orders: Arc<InMemoryOrders>,
    pub gateway: Arc<SandboxGateway>,
    pub cache: Cache,
    pub events: EventBus,
    pub session: Arc<CartSession>,
    pub checkout: CheckoutOrchestrator,
}

impl Storefront {
    pub fn new() -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        for (sneaker, stock) in [("air-max-90", 10), ("dunk-low", 10), ("jordan-1", 1)] {
            catalog.add_variant(Variant::new(format!("{sneaker}-41"), sneaker, "41", "black", stock));
        }
        Self::with_catalog(catalog)
    }

    pub fn with_catalog(catalog: Arc<InMemoryCatalog>) -> Self {
        let server = Arc::new(InMemoryCartServer::new());
        let coupons = Arc::new(InMemoryCoupons::new());
        let orders = Arc::new(InMemoryOrders::new());
        let gateway = Arc::new(SandboxGateway::new());
        let cache = Cache::in_memory();
        let events = EventBus::default();

        let session = Arc::new(Self::open_session(
            &cache,
            server.clone(),
            catalog.clone(),
            coupons.clone(),
            events.clone(),
        ));
        let checkout = CheckoutOrchestrator::new(
            session.clone(),
            orders.clone(),
            PaymentAdapters::new(gateway.clone(), PaymentSettings::default()),
            Rate::from_bps(500),
        );

        Self {
            catalog,
            server,
            coupons,
            orders,
            gateway,
            cache,
            events,
            session,
            checkout,
        }
    }

    fn open_session(
        cache: &Cache,
        server: Arc<InMemoryCartServer>,
        catalog: Arc<InMemoryCatalog>,
        coupons: Arc<InMemoryCoupons>,
        events: EventBus,
    ) -> CartSession {
        let deps = SessionDeps {
            api: server,
            catalog,
            coupons,
            validator: IntegrityValidator::default(),
            events,
        };
        CartSession::restore(LocalCartStore::new(cache.clone(), DeviceKey::new(DEVICE)), deps)
            .unwrap()
    }

    /// A second session against the same server, e.g. another browser tab.
    pub fn another_tab(&self) -> CartSession {
        Self::open_session(
            &Cache::in_memory(),
            self.server.clone(),
            self.catalog.clone(),
            self.coupons.clone(),
            self.events.clone(),
        )
    }

    pub fn local(&self) -> LocalCartStore {
        LocalCartStore::new(self.cache.clone(), DeviceKey::new(DEVICE))
    }

    /// Run a flow up to the payment step.
    pub async fn flow_at_payment(
        &self,
        shipping_cents: i64,
        method: PaymentMethod,
    ) -> CheckoutFlow {
        let mut flow = self.checkout.begin();
        self.checkout.advance(&mut flow).await.unwrap();
        flow.set_shipping_address(address());
        flow.set_shipping_method(shipping(shipping_cents));
        flow.set_payment_method(method);
        self.checkout.advance(&mut flow).await.unwrap();
        flow
    }
}

pub fn line(sneaker: &str, quantity: i64, price_cents: i64) -> CartLineRequest {
    CartLineRequest {
        sneaker_id: Some(sneaker.to_string()),
        variant_id: Some(format!("{sneaker}-41")),
        size: Some("41".to_string()),
        color: Some("black".to_string()),
        quantity: Some(quantity),
        price: Some(Money::brl(price_cents)),
        name: Some(sneaker.replace('-', " ")),
        ..Default::default()
    }
}

pub fn address() -> Address {
    Address::new(
        "Carla Mendes",
        "Rua Augusta",
        "1500",
        "Consolação",
        "São Paulo",
        "SP",
        "01304-001",
    )
}

pub fn shipping(cents: i64) -> ShippingSelection {
    ShippingSelection::from_method(
        &ShippingMethod::new("SEDEX", Money::brl(cents)).with_carrier("Correios"),
    )
}
