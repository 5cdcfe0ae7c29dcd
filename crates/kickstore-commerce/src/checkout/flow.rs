//! Checkout flow state machine.

use crate::cart::{AvailabilityReport, Cart};
use crate::checkout::{Address, ShippingSelection};
use crate::error::CommerceError;
use crate::ids::{CartId, OrderId};
use crate::payment::PaymentMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Steps in the checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Cart review.
    Cart,
    /// Shipping address and method.
    Identification,
    /// Payment method and submission.
    Payment,
    /// Order placed.
    Confirmation,
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Cart => "cart",
            CheckoutStep::Identification => "identification",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Confirmation => "confirmation",
        }
    }

    /// Get the step number (1-indexed).
    pub fn number(&self) -> u8 {
        match self {
            CheckoutStep::Cart => 1,
            CheckoutStep::Identification => 2,
            CheckoutStep::Payment => 3,
            CheckoutStep::Confirmation => 4,
        }
    }

    pub fn next(&self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::Cart => Some(CheckoutStep::Identification),
            CheckoutStep::Identification => Some(CheckoutStep::Payment),
            CheckoutStep::Payment => Some(CheckoutStep::Confirmation),
            CheckoutStep::Confirmation => None,
        }
    }

    pub fn previous(&self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::Cart => None,
            CheckoutStep::Identification => Some(CheckoutStep::Cart),
            CheckoutStep::Payment => Some(CheckoutStep::Identification),
            CheckoutStep::Confirmation => Some(CheckoutStep::Payment),
        }
    }
}

/// Checkout flow state.
///
/// Moving past cart review needs a non-empty cart whose latest availability
/// report still matches it and passed. Payment additionally needs a complete
/// address and a shipping method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutFlow {
    /// Associated cart ID.
    pub cart_id: CartId,
    step: CheckoutStep,
    completed_steps: Vec<CheckoutStep>,
    shipping_address: Option<Address>,
    shipping_method: Option<ShippingSelection>,
    payment_method: Option<PaymentMethod>,
    availability: Option<AvailabilityReport>,
    order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckoutFlow {
    /// Create a new checkout flow.
    pub fn new(cart_id: CartId) -> Self {
        let now = Utc::now();
        Self {
            cart_id,
            step: CheckoutStep::Cart,
            completed_steps: Vec::new(),
            shipping_address: None,
            shipping_method: None,
            payment_method: None,
            availability: None,
            order_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn completed_steps(&self) -> &[CheckoutStep] {
        &self.completed_steps
    }

    pub fn shipping_address(&self) -> Option<&Address> {
        self.shipping_address.as_ref()
    }

    pub fn shipping_method(&self) -> Option<&ShippingSelection> {
        self.shipping_method.as_ref()
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    /// Latest availability report.
    pub fn availability(&self) -> Option<&AvailabilityReport> {
        self.availability.as_ref()
    }

    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    /// Check whether `step` may be entered with this cart.
    pub fn gate(&self, step: CheckoutStep, cart: &Cart) -> Result<(), CommerceError> {
        match step {
            CheckoutStep::Cart => Ok(()),
            CheckoutStep::Identification => self.review_gate(cart),
            CheckoutStep::Payment => {
                self.review_gate(cart)?;
                let missing = self.missing_identification();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(CommerceError::CheckoutIncomplete(missing.join(", ")))
                }
            }
            CheckoutStep::Confirmation => match (&self.order_id, self.payment_method) {
                (Some(_), Some(_)) => Ok(()),
                _ => Err(CommerceError::CheckoutIncomplete("order submission".to_string())),
            },
        }
    }

    fn review_gate(&self, cart: &Cart) -> Result<(), CommerceError> {
        if cart.id != self.cart_id {
            return Err(CommerceError::InvalidCheckoutTransition {
                from: self.step.as_str().to_string(),
                to: format!("cart {}", cart.id),
            });
        }
        if cart.is_empty() {
            return Err(CommerceError::CheckoutIncomplete("cart items".to_string()));
        }
        match &self.availability {
            Some(report) if report.covers(cart) => {
                if report.all_available() {
                    Ok(())
                } else {
                    Err(CommerceError::Unavailable(report.clone()))
                }
            }
            _ => Err(CommerceError::CheckoutIncomplete(
                "availability check".to_string(),
            )),
        }
    }

    fn missing_identification(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self
            .shipping_address
            .as_ref()
            .is_some_and(Address::is_complete)
        {
            missing.push("shipping address");
        }
        if self.shipping_method.is_none() {
            missing.push("shipping method");
        }
        missing
    }

    /// Advance to the next step.
    pub fn advance(&mut self, cart: &Cart) -> Result<CheckoutStep, CommerceError> {
        let next = self
            .step
            .next()
            .ok_or_else(|| CommerceError::InvalidCheckoutTransition {
                from: self.step.as_str().to_string(),
                to: "none".to_string(),
            })?;

        if let Err(e) = self.gate(next, cart) {
            tracing::info!(
                cart_id = %self.cart_id,
                from = self.step.as_str(),
                to = next.as_str(),
                error = %e,
                "checkout step blocked"
            );
            return Err(e);
        }

        if !self.completed_steps.contains(&self.step) {
            self.completed_steps.push(self.step);
        }
        self.step = next;
        self.updated_at = Utc::now();
        Ok(next)
    }

    /// Go back to the previous step.
    pub fn go_back(&mut self) -> Result<CheckoutStep, CommerceError> {
        if self.step == CheckoutStep::Confirmation {
            return Err(CommerceError::InvalidCheckoutTransition {
                from: "confirmation".to_string(),
                to: "payment".to_string(),
            });
        }
        let prev = self
            .step
            .previous()
            .ok_or_else(|| CommerceError::InvalidCheckoutTransition {
                from: self.step.as_str().to_string(),
                to: "none".to_string(),
            })?;

        self.step = prev;
        self.updated_at = Utc::now();
        Ok(prev)
    }

    /// Set the shipping address.
    pub fn set_shipping_address(&mut self, address: Address) {
        self.shipping_address = Some(address);
        self.updated_at = Utc::now();
    }

    /// Set the shipping method.
    pub fn set_shipping_method(&mut self, selection: ShippingSelection) {
        self.shipping_method = Some(selection);
        self.updated_at = Utc::now();
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = Some(method);
        self.updated_at = Utc::now();
    }

    /// Store the result of the latest availability check.
    pub fn record_availability(&mut self, report: AvailabilityReport) {
        self.availability = Some(report);
        self.updated_at = Utc::now();
    }

    pub(crate) fn record_order(&mut self, order_id: OrderId) {
        self.order_id = Some(order_id);
        self.updated_at = Utc::now();
    }

    /// Check if checkout is complete.
    pub fn is_complete(&self) -> bool {
        self.step == CheckoutStep::Confirmation
    }

    /// Get progress percentage.
    pub fn progress_percent(&self) -> u8 {
        self.step.number() * 25
    }
}
