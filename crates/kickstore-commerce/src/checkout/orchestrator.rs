//! Checkout orchestration: cart review through payment settlement.

use crate::cart::AvailabilityReport;
use crate::checkout::{
    quote, CheckoutFlow, CheckoutQuote, CheckoutStep, NewOrder, Order, OrderHistory, OrderItem,
    OrderRepository, OrderStatus, PaymentResult,
};
use crate::error::CommerceError;
use crate::events::{CommerceEvent, EventBus};
use crate::ids::{OrderId, PaymentId};
use crate::money::{Money, Rate};
use crate::payment::{
    BoletoWebhook, CardToken, PaymentAdapters, PaymentArtifact, PaymentError, PaymentMethod,
    PaymentRequest, PaymentStatus,
};
use crate::sync::CartSession;
use chrono::Utc;
use std::sync::Arc;

/// Reason recorded when an unpaid PIX or boleto runs out.
pub const PAYMENT_EXPIRED_REASON: &str = "payment expired";

/// Drives a [`CheckoutFlow`] to an order and the order to a terminal state.
///
/// The cart is left alone when an order is created and emptied only once its
/// payment settles, so a failed payment never costs the shopper their cart.
pub struct CheckoutOrchestrator {
    session: Arc<CartSession>,
    orders: Arc<dyn OrderRepository>,
    payments: PaymentAdapters,
    pix_rate: Rate,
    events: EventBus,
}

impl CheckoutOrchestrator {
    pub fn new(
        session: Arc<CartSession>,
        orders: Arc<dyn OrderRepository>,
        payments: PaymentAdapters,
        pix_rate: Rate,
    ) -> Self {
        let events = session.events().clone();
        Self {
            session,
            orders,
            payments,
            pix_rate,
            events,
        }
    }

    pub fn session(&self) -> &CartSession {
        &self.session
    }

    pub fn payments(&self) -> &PaymentAdapters {
        &self.payments
    }

    /// Start a checkout for the current cart.
    pub fn begin(&self) -> CheckoutFlow {
        CheckoutFlow::new(self.session.cart().id)
    }

    /// Check live stock for every line and remember the report on the flow.
    pub async fn review(&self, flow: &mut CheckoutFlow) -> Result<AvailabilityReport, CommerceError> {
        let report = self.session.check_availability().await?;
        flow.record_availability(report.clone());
        Ok(report)
    }

    /// Move to the next step. Leaving cart review always re-checks stock first.
    pub async fn advance(&self, flow: &mut CheckoutFlow) -> Result<CheckoutStep, CommerceError> {
        if flow.step() == CheckoutStep::Cart {
            self.review(flow).await?;
        }
        flow.advance(&self.session.cart())
    }

    /// Price the current cart for a payment method.
    pub fn quote(
        &self,
        flow: &CheckoutFlow,
        method: PaymentMethod,
    ) -> Result<CheckoutQuote, CommerceError> {
        let cart = self.session.cart();
        let shipping = flow
            .shipping_method()
            .map(|selection| selection.rate)
            .unwrap_or_else(|| Money::zero(cart.currency));
        quote(
            cart.total_price(),
            shipping,
            cart.applied_coupon().map(|coupon| &coupon.value),
            method,
            self.pix_rate,
        )
    }

    /// Snapshot the cart into a pending order.
    pub async fn submit(&self, flow: &mut CheckoutFlow) -> Result<Order, CommerceError> {
        let user_id = self
            .session
            .user_id()
            .ok_or(CommerceError::MissingIdentity("user id"))?;
        if flow.step() != CheckoutStep::Payment {
            return Err(CommerceError::InvalidCheckoutTransition {
                from: flow.step().as_str().to_string(),
                to: CheckoutStep::Confirmation.as_str().to_string(),
            });
        }

        let cart = self.session.cart();
        flow.gate(CheckoutStep::Payment, &cart)?;
        let payment_method = flow
            .payment_method()
            .ok_or_else(|| CommerceError::CheckoutIncomplete("payment method".to_string()))?;
        let (Some(address), Some(shipping)) = (flow.shipping_address(), flow.shipping_method())
        else {
            return Err(CommerceError::CheckoutIncomplete(
                "shipping address, shipping method".to_string(),
            ));
        };

        let quote = quote(
            cart.total_price(),
            shipping.rate,
            cart.applied_coupon().map(|coupon| &coupon.value),
            payment_method,
            self.pix_rate,
        )?;
        let order = Order::new(NewOrder {
            user_id,
            items: cart.items().iter().map(OrderItem::from_cart_item).collect(),
            shipping_address: address.clone(),
            shipping_method: shipping.clone(),
            payment_method,
            quote,
            coupon_code: cart.applied_coupon_code().map(str::to_string),
        })?;

        let order = self.orders.create(&order).await?;
        flow.record_order(order.id.clone());
        flow.advance(&cart)?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total_price().display(),
            method = payment_method.as_str(),
            "order created"
        );
        self.events.emit(CommerceEvent::OrderCreated {
            order_id: order.id.clone(),
            total: order.total_price(),
        });
        Ok(order)
    }

    /// Generate (or regenerate) the payment artifact for a pending order.
    ///
    /// A card capture settles the order immediately. Failures leave the order
    /// pending so the shopper can retry explicitly.
    pub async fn pay(
        &self,
        order_id: &OrderId,
        payer_email: Option<String>,
        card: Option<CardToken>,
    ) -> Result<PaymentArtifact, CommerceError> {
        let mut order = self.load(order_id).await?;
        if order.status() != OrderStatus::Pending {
            return Err(CommerceError::InvalidOrderTransition {
                from: order.status(),
                to: OrderStatus::Processing,
            });
        }

        let method = order.payment_method();
        let request = PaymentRequest {
            order_id: order.id.clone(),
            method,
            amount: order.total_price(),
            description: format!("Kickstore order {}", order.id),
            payer_email: payer_email.clone(),
            card,
        };

        let artifact = match self.payments.get(method).generate(&request).await {
            Ok(artifact) => artifact,
            Err(e) => return Err(self.payment_failed(&order, method, e)),
        };

        order.attach_payment(PaymentResult {
            id: artifact.payment_id().clone(),
            status: artifact.initial_status(),
            update_time: Utc::now(),
            email_address: payer_email,
            expires_at: artifact.expires_at(),
        })?;
        let order = self.orders.update(&order).await?;

        tracing::info!(
            order_id = %order.id,
            payment_id = %artifact.payment_id(),
            method = method.as_str(),
            "payment generated"
        );
        self.events.emit(CommerceEvent::PaymentGenerated {
            order_id: order.id.clone(),
            payment_id: artifact.payment_id().clone(),
            method,
        });

        if artifact.initial_status().is_approved() {
            self.settle(order, artifact.payment_id().clone()).await?;
        }
        Ok(artifact)
    }

    /// Ask the adapter for the current payment status and apply it.
    ///
    /// This is the manual PIX check; nothing polls in the background.
    pub async fn verify_payment(&self, order_id: &OrderId) -> Result<PaymentStatus, CommerceError> {
        let mut order = self.load(order_id).await?;
        if order.is_paid() {
            return Ok(PaymentStatus::Approved);
        }
        let (payment_id, expires_at) = order
            .payment_result()
            .map(|result| (result.id.clone(), result.expires_at))
            .ok_or_else(|| CommerceError::CheckoutIncomplete("payment".to_string()))?;

        let method = order.payment_method();
        let verified = self
            .payments
            .get(method)
            .verify_until(&payment_id, expires_at)
            .await;
        let status = match verified {
            Ok(status) => status,
            Err(e) => return Err(self.payment_failed(&order, method, e)),
        };
        tracing::debug!(order_id = %order.id, payment_id = %payment_id, status = status.as_str(), "payment verified");

        match status {
            PaymentStatus::Approved => {
                self.settle(order, payment_id).await?;
            }
            PaymentStatus::Expired => {
                if order.status() == OrderStatus::Pending {
                    order.record_payment_status(PaymentStatus::Expired);
                    order.cancel(PAYMENT_EXPIRED_REASON)?;
                    let order = self.orders.update(&order).await?;
                    tracing::info!(order_id = %order.id, "order cancelled, payment expired");
                    self.events.emit(CommerceEvent::PaymentExpired {
                        order_id: order.id.clone(),
                        payment_id,
                    });
                    self.emit_transition(&order, OrderStatus::Pending);
                }
            }
            PaymentStatus::Declined | PaymentStatus::Cancelled => {
                order.record_payment_status(status);
                self.orders.update(&order).await?;
            }
            PaymentStatus::Pending => {}
        }
        Ok(status)
    }

    /// Apply a boleto notification from the gateway to its order.
    pub async fn handle_boleto_webhook(
        &self,
        order_id: &OrderId,
        webhook: &BoletoWebhook,
    ) -> Result<PaymentStatus, CommerceError> {
        let order = self.load(order_id).await?;
        let matches = order
            .payment_result()
            .is_some_and(|result| result.id == webhook.payment_id);
        if !matches || order.payment_method() != PaymentMethod::Boleto {
            return Err(PaymentError::UnknownPayment(webhook.payment_id.to_string()).into());
        }

        self.payments.boleto().apply_webhook(webhook);
        self.verify_payment(order_id).await
    }

    /// Fulfillment hook: `processing -> shipped`.
    pub async fn ship(
        &self,
        order_id: &OrderId,
        tracking_number: impl Into<String>,
    ) -> Result<Order, CommerceError> {
        let tracking_number = tracking_number.into();
        self.transition(order_id, |order| order.ship(tracking_number))
            .await
    }

    /// Fulfillment hook: `shipped -> delivered`.
    pub async fn deliver(&self, order_id: &OrderId) -> Result<Order, CommerceError> {
        self.transition(order_id, Order::deliver).await
    }

    /// Cancel a pending or processing order.
    pub async fn cancel(
        &self,
        order_id: &OrderId,
        reason: impl Into<String>,
    ) -> Result<Order, CommerceError> {
        let reason = reason.into();
        self.transition(order_id, |order| order.cancel(reason)).await
    }

    /// Paged order history of the signed-in user.
    pub fn history(&self, per_page: u32) -> Result<OrderHistory, CommerceError> {
        let user_id = self
            .session
            .user_id()
            .ok_or(CommerceError::MissingIdentity("user id"))?;
        Ok(OrderHistory::new(self.orders.clone(), user_id, per_page))
    }

    async fn load(&self, order_id: &OrderId) -> Result<Order, CommerceError> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.to_string()))
    }

    async fn transition(
        &self,
        order_id: &OrderId,
        apply: impl FnOnce(&mut Order) -> Result<(), CommerceError>,
    ) -> Result<Order, CommerceError> {
        let mut order = self.load(order_id).await?;
        let from = order.status();
        apply(&mut order)?;
        let order = self.orders.update(&order).await?;
        self.emit_transition(&order, from);
        Ok(order)
    }

    async fn settle(&self, mut order: Order, payment_id: PaymentId) -> Result<(), CommerceError> {
        let email_address = order
            .payment_result()
            .and_then(|result| result.email_address.clone());
        order.mark_paid(PaymentResult {
            id: payment_id.clone(),
            status: PaymentStatus::Approved,
            update_time: Utc::now(),
            email_address,
            expires_at: None,
        })?;
        let order = self.orders.update(&order).await?;

        tracing::info!(order_id = %order.id, payment_id = %payment_id, "payment settled");
        self.events.emit(CommerceEvent::PaymentSettled {
            order_id: order.id.clone(),
            payment_id,
        });
        self.emit_transition(&order, OrderStatus::Pending);

        // Settlement can arrive after the buyer has left the session.
        if self.session.user_id().as_ref() == Some(&order.user_id) {
            if let Err(e) = self.session.complete_checkout().await {
                tracing::warn!(order_id = %order.id, error = %e, "order paid but cart could not be cleared");
            }
        } else {
            tracing::debug!(order_id = %order.id, "order paid outside its owner's session, cart left alone");
        }
        Ok(())
    }

    fn payment_failed(&self, order: &Order, method: PaymentMethod, error: PaymentError) -> CommerceError {
        tracing::warn!(
            order_id = %order.id,
            method = method.as_str(),
            error = %error,
            "payment failed"
        );
        self.events.emit(CommerceEvent::PaymentFailed {
            order_id: order.id.clone(),
            method,
            reason: error.to_string(),
            retryable: error.is_retryable(),
        });
        error.into()
    }

    fn emit_transition(&self, order: &Order, from: OrderStatus) {
        tracing::info!(
            order_id = %order.id,
            from = from.as_str(),
            to = order.status().as_str(),
            "order status changed"
        );
        self.events.emit(CommerceEvent::OrderStatusChanged {
            order_id: order.id.clone(),
            from,
            to: order.status(),
        });
    }
}
