//! Common payment adapter contract.

use crate::ids::PaymentId;
use crate::payment::{
    BoletoAdapter, CardAdapter, PaymentArtifact, PaymentError, PaymentGateway, PaymentMethod,
    PaymentRequest, PaymentStatus, PixAdapter,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A payment method implementation.
#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// The method this adapter serves.
    fn method(&self) -> PaymentMethod;

    /// Produce the method-specific artifact the payer acts on.
    async fn generate(&self, request: &PaymentRequest) -> Result<PaymentArtifact, PaymentError>;

    /// Ask for the current settlement status.
    async fn verify(&self, payment_id: &PaymentId) -> Result<PaymentStatus, PaymentError> {
        self.verify_until(payment_id, None).await
    }

    /// Like [`PaymentAdapter::verify`], against the deadline recorded when the
    /// artifact was issued. A payment still pending at `expires_at` is
    /// reported as [`PaymentStatus::Expired`].
    async fn verify_until(
        &self,
        payment_id: &PaymentId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PaymentStatus, PaymentError>;
}

/// Adapter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSettings {
    pub pix_expiry_minutes: i64,
    pub boleto_due_business_days: u32,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            pix_expiry_minutes: 30,
            boleto_due_business_days: 3,
        }
    }
}

/// One adapter per payment method, sharing a gateway.
pub struct PaymentAdapters {
    pix: PixAdapter,
    boleto: BoletoAdapter,
    card: CardAdapter,
}

impl PaymentAdapters {
    pub fn new(gateway: Arc<dyn PaymentGateway>, settings: PaymentSettings) -> Self {
        Self {
            pix: PixAdapter::new(gateway.clone(), settings.pix_expiry_minutes),
            boleto: BoletoAdapter::new(gateway.clone(), settings.boleto_due_business_days),
            card: CardAdapter::new(gateway),
        }
    }

    pub fn get(&self, method: PaymentMethod) -> &dyn PaymentAdapter {
        match method {
            PaymentMethod::Pix => &self.pix,
            PaymentMethod::Boleto => &self.boleto,
            PaymentMethod::CreditCard => &self.card,
        }
    }

    pub fn pix(&self) -> &PixAdapter {
        &self.pix
    }

    pub fn boleto(&self) -> &BoletoAdapter {
        &self.boleto
    }

    pub fn card(&self) -> &CardAdapter {
        &self.card
    }
}

pub(crate) fn past_deadline(
    status: PaymentStatus,
    expires_at: Option<DateTime<Utc>>,
) -> PaymentStatus {
    match status {
        PaymentStatus::Pending if expires_at.is_some_and(|at| Utc::now() >= at) => {
            PaymentStatus::Expired
        }
        status => status,
    }
}

pub(crate) fn check_method(
    got: PaymentMethod,
    expected: PaymentMethod,
) -> Result<(), PaymentError> {
    if got != expected {
        return Err(PaymentError::MethodMismatch {
            expected: expected.as_str(),
            got: got.as_str(),
        });
    }
    Ok(())
}

pub(crate) fn check_request(
    request: &PaymentRequest,
    expected: PaymentMethod,
) -> Result<(), PaymentError> {
    check_method(request.method, expected)?;
    if !request.amount.is_positive() {
        return Err(PaymentError::InvalidAmount(request.amount.amount_cents));
    }
    Ok(())
}
