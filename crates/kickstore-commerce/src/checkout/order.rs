//! Order types and the order state machine.

use crate::cart::CartItem;
use crate::catalog::VariantRef;
use crate::checkout::{Address, CheckoutQuote, ShippingSelection};
use crate::error::CommerceError;
use crate::ids::{OrderId, PaymentId, SneakerId, UserId};
use crate::money::Money;
use crate::payment::{PaymentMethod, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, awaiting payment.
    #[default]
    Pending,
    /// Payment accepted.
    Processing,
    /// Order shipped.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled.
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Check if order can be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Whether the state machine allows moving to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }
}

/// A line of an order, copied from the cart at submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    #[serde(rename = "sneaker")]
    pub sneaker_id: SneakerId,
    pub variant: VariantRef,
    pub name: String,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    /// Unit price at submission.
    pub price: Money,
}

impl OrderItem {
    pub fn from_cart_item(item: &CartItem) -> Self {
        Self {
            sneaker_id: item.sneaker_id.clone(),
            variant: item.variant.clone(),
            name: item.name.clone(),
            size: item.size.clone(),
            color: item.color.clone(),
            quantity: item.quantity,
            price: item.price,
        }
    }

    pub fn line_total(&self) -> Result<Money, CommerceError> {
        self.price
            .try_multiply(self.quantity)
            .ok_or(CommerceError::Overflow)
    }
}

/// Payment outcome recorded on an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentResult {
    pub id: PaymentId,
    pub status: PaymentStatus,
    pub update_time: DateTime<Utc>,
    pub email_address: Option<String>,
    /// Deadline of an unpaid PIX or boleto artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// An order: the frozen snapshot of a cart plus shipping and payment data.
///
/// Lines and totals are fixed at creation. Status only moves through
/// [`OrderStatus::can_transition_to`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "user")]
    pub user_id: UserId,
    order_items: Vec<OrderItem>,
    shipping_address: Address,
    shipping_method: ShippingSelection,
    payment_method: PaymentMethod,
    payment_result: Option<PaymentResult>,
    subtotal_price: Money,
    shipping_price: Money,
    discount_amount: Money,
    total_price: Money,
    coupon_applied: Option<String>,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    status: OrderStatus,
    tracking_number: Option<String>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Everything needed to create an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    pub shipping_method: ShippingSelection,
    pub payment_method: PaymentMethod,
    pub quote: CheckoutQuote,
    pub coupon_code: Option<String>,
}

impl Order {
    /// Create a pending, unpaid order.
    pub fn new(new: NewOrder) -> Result<Self, CommerceError> {
        if new.items.is_empty() {
            return Err(CommerceError::CheckoutIncomplete("order items".to_string()));
        }
        let now = Utc::now();
        Ok(Self {
            id: OrderId::generate(),
            user_id: new.user_id,
            order_items: new.items,
            shipping_address: new.shipping_address,
            shipping_method: new.shipping_method,
            payment_method: new.payment_method,
            payment_result: None,
            subtotal_price: new.quote.subtotal,
            shipping_price: new.quote.shipping,
            discount_amount: new.quote.discount_total,
            total_price: new.quote.total,
            coupon_applied: new.coupon_code,
            is_paid: false,
            paid_at: None,
            status: OrderStatus::Pending,
            tracking_number: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn order_items(&self) -> &[OrderItem] {
        &self.order_items
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn shipping_method(&self) -> &ShippingSelection {
        &self.shipping_method
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_result(&self) -> Option<&PaymentResult> {
        self.payment_result.as_ref()
    }

    pub fn subtotal_price(&self) -> Money {
        self.subtotal_price
    }

    pub fn shipping_price(&self) -> Money {
        self.shipping_price
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    /// `subtotal + shipping - discount`, frozen at creation.
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn coupon_applied(&self) -> Option<&str> {
        self.coupon_applied.as_deref()
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Get total item count.
    pub fn item_count(&self) -> i64 {
        self.order_items.iter().map(|i| i.quantity).sum()
    }

    fn transition(&mut self, next: OrderStatus) -> Result<OrderStatus, CommerceError> {
        if !self.status.can_transition_to(next) {
            return Err(CommerceError::InvalidOrderTransition {
                from: self.status,
                to: next,
            });
        }
        let previous = self.status;
        self.status = next;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    /// Record the payment artifact issued for this order.
    pub fn attach_payment(&mut self, result: PaymentResult) -> Result<(), CommerceError> {
        if self.status != OrderStatus::Pending {
            return Err(CommerceError::InvalidOrderTransition {
                from: self.status,
                to: OrderStatus::Pending,
            });
        }
        self.payment_result = Some(result);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `pending -> processing`: payment accepted.
    pub fn mark_paid(&mut self, result: PaymentResult) -> Result<(), CommerceError> {
        self.transition(OrderStatus::Processing)?;
        self.is_paid = true;
        self.paid_at = Some(result.update_time);
        self.payment_result = Some(result);
        Ok(())
    }

    /// `processing -> shipped`.
    pub fn ship(&mut self, tracking_number: impl Into<String>) -> Result<(), CommerceError> {
        self.transition(OrderStatus::Shipped)?;
        self.tracking_number = Some(tracking_number.into());
        self.shipped_at = Some(self.updated_at);
        Ok(())
    }

    /// `shipped -> delivered`.
    pub fn deliver(&mut self) -> Result<(), CommerceError> {
        self.transition(OrderStatus::Delivered)?;
        self.delivered_at = Some(self.updated_at);
        Ok(())
    }

    /// `pending | processing -> cancelled`, recording why.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), CommerceError> {
        self.transition(OrderStatus::Cancelled)?;
        self.cancelled_at = Some(self.updated_at);
        self.cancellation_reason = Some(reason.into());
        Ok(())
    }

    /// Update the payment status without changing order state.
    pub(crate) fn record_payment_status(&mut self, status: PaymentStatus) {
        if let Some(result) = &mut self.payment_result {
            result.status = status;
            result.update_time = Utc::now();
        }
    }
}
