//! Credit card: synchronous capture at submission.

use crate::ids::PaymentId;
use crate::payment::adapter::check_request;
use crate::payment::{
    PaymentAdapter, PaymentArtifact, PaymentError, PaymentGateway, PaymentMethod, PaymentRequest,
    PaymentStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Credit card adapter. Tokenization happens in the gateway's client widget;
/// this adapter only captures a token.
pub struct CardAdapter {
    gateway: Arc<dyn PaymentGateway>,
}

impl CardAdapter {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl PaymentAdapter for CardAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::CreditCard
    }

    async fn generate(&self, request: &PaymentRequest) -> Result<PaymentArtifact, PaymentError> {
        check_request(request, PaymentMethod::CreditCard)?;
        let card = request.card.as_ref().ok_or(PaymentError::MissingCardToken)?;

        let payment = self.gateway.create_payment(request).await?;
        match payment.status {
            PaymentStatus::Approved => {
                tracing::info!(
                    order_id = %request.order_id,
                    payment_id = %payment.id,
                    "card captured"
                );
                Ok(PaymentArtifact::CreditCard {
                    payment_id: payment.id,
                    last_four: card.last_four.clone(),
                    status: PaymentStatus::Approved,
                    authorization_code: payment.authorization_code,
                })
            }
            PaymentStatus::Declined | PaymentStatus::Cancelled | PaymentStatus::Expired => {
                let reason = payment
                    .status_detail
                    .unwrap_or_else(|| payment.status.as_str().to_string());
                tracing::warn!(order_id = %request.order_id, %reason, "card declined");
                Err(PaymentError::Declined { reason })
            }
            PaymentStatus::Pending => Err(PaymentError::Gateway(format!(
                "capture of payment {} did not complete",
                payment.id
            ))),
        }
    }

    /// Captures settle at submission; there is no deadline to apply.
    async fn verify_until(
        &self,
        payment_id: &PaymentId,
        _expires_at: Option<DateTime<Utc>>,
    ) -> Result<PaymentStatus, PaymentError> {
        let payment = self
            .gateway
            .payment_status(payment_id, PaymentMethod::CreditCard)
            .await?;
        Ok(payment.status)
    }
}
