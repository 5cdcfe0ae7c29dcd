//! Payment gateway collaborator.

use crate::ids::PaymentId;
use crate::money::Money;
use crate::payment::{PaymentError, PaymentMethod, PaymentRequest, PaymentStatus};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use mockall::automock;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A payment as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: PaymentId,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Gateway-specific reason, e.g. the decline code.
    pub status_detail: Option<String>,
    pub amount: Money,
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub barcode: Option<String>,
    pub ticket_url: Option<String>,
    pub authorization_code: Option<String>,
    pub payer_email: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// `POST /payments/payment` and `GET /payments/:id/status`.
#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment; card payments are captured synchronously.
    async fn create_payment(&self, request: &PaymentRequest)
        -> Result<GatewayPayment, PaymentError>;

    /// Current state of a payment. `method` is what the caller issued it
    /// as; gateways that omit the method in status replies report this one.
    async fn payment_status(
        &self,
        payment_id: &PaymentId,
        method: PaymentMethod,
    ) -> Result<GatewayPayment, PaymentError>;
}

/// Token prefix the sandbox treats as a refused card.
pub const SANDBOX_DECLINE_PREFIX: &str = "tok_decline";

/// Deterministic in-process gateway for development and tests.
///
/// Card tokens starting with [`SANDBOX_DECLINE_PREFIX`] are declined, every
/// other card is approved. PIX and Boleto payments stay pending until
/// [`SandboxGateway::settle`] or [`SandboxGateway::expire`] is called.
#[derive(Debug, Default)]
pub struct SandboxGateway {
    payments: RwLock<HashMap<PaymentId, GatewayPayment>>,
    sequence: AtomicU64,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a payment approved, as when the payer completes it.
    pub fn settle(&self, payment_id: &PaymentId) -> bool {
        self.set_status(payment_id, PaymentStatus::Approved)
    }

    /// Mark a payment expired.
    pub fn expire(&self, payment_id: &PaymentId) -> bool {
        self.set_status(payment_id, PaymentStatus::Expired)
    }

    pub fn set_status(&self, payment_id: &PaymentId, status: PaymentStatus) -> bool {
        match self.payments.write().get_mut(payment_id) {
            Some(payment) => {
                payment.status = status;
                payment.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn payment(&self, payment_id: &PaymentId) -> Option<GatewayPayment> {
        self.payments.read().get(payment_id).cloned()
    }

    fn pix_payload(id: &PaymentId, amount: &Money) -> String {
        let amount = format!("{}.{:02}", amount.amount_cents / 100, amount.amount_cents % 100);
        format!(
            "00020126360014br.gov.bcb.pix0114{id}52040000530398654{:02}{amount}5802BR5909KICKSTORE6009SAO PAULO6304",
            amount.len()
        )
    }

    fn boleto_barcode(seq: u64, amount: &Money) -> String {
        format!("23790{:010}{:032}", amount.amount_cents, seq)
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<GatewayPayment, PaymentError> {
        if !request.amount.is_positive() {
            return Err(PaymentError::InvalidAmount(request.amount.amount_cents));
        }

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let id = PaymentId::new(format!("sbx_{seq:08}"));
        let mut payment = GatewayPayment {
            id: id.clone(),
            method: request.method,
            status: PaymentStatus::Pending,
            status_detail: None,
            amount: request.amount,
            qr_code: None,
            qr_code_base64: None,
            barcode: None,
            ticket_url: None,
            authorization_code: None,
            payer_email: request.payer_email.clone(),
            updated_at: Utc::now(),
        };

        match request.method {
            PaymentMethod::Pix => {
                let payload = Self::pix_payload(&id, &request.amount);
                payment.qr_code_base64 = Some(STANDARD.encode(payload.as_bytes()));
                payment.qr_code = Some(payload);
            }
            PaymentMethod::Boleto => {
                payment.barcode = Some(Self::boleto_barcode(seq, &request.amount));
                payment.ticket_url = Some(format!("https://sandbox.kickstore.dev/boletos/{id}.pdf"));
            }
            PaymentMethod::CreditCard => {
                let card = request.card.as_ref().ok_or(PaymentError::MissingCardToken)?;
                if card.token.starts_with(SANDBOX_DECLINE_PREFIX) {
                    payment.status = PaymentStatus::Declined;
                    payment.status_detail = Some("cc_rejected_insufficient_amount".to_string());
                } else {
                    payment.status = PaymentStatus::Approved;
                    payment.status_detail = Some("accredited".to_string());
                    payment.authorization_code = Some(format!("AUTH{seq:06}"));
                }
            }
        }

        tracing::debug!(payment_id = %id, method = %request.method, status = payment.status.as_str(), "sandbox payment created");
        self.payments.write().insert(id, payment.clone());
        Ok(payment)
    }

    async fn payment_status(
        &self,
        payment_id: &PaymentId,
        _method: PaymentMethod,
    ) -> Result<GatewayPayment, PaymentError> {
        self.payment(payment_id)
            .ok_or_else(|| PaymentError::UnknownPayment(payment_id.to_string()))
    }
}
