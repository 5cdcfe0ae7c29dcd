//! PIX: instant transfer through a QR code, verified on demand.

use crate::ids::PaymentId;
use crate::payment::adapter::{check_method, check_request, past_deadline};
use crate::payment::{
    PaymentAdapter, PaymentArtifact, PaymentError, PaymentGateway, PaymentMethod, PaymentRequest,
    PaymentStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// PIX adapter.
///
/// Verification is a one-off call made when the payer asks for it; the
/// adapter never polls and keeps no per-payment state. The QR expiry travels
/// with the artifact and comes back through [`PaymentAdapter::verify_until`].
pub struct PixAdapter {
    gateway: Arc<dyn PaymentGateway>,
    expiry: Duration,
}

impl PixAdapter {
    pub fn new(gateway: Arc<dyn PaymentGateway>, expiry_minutes: i64) -> Self {
        Self {
            gateway,
            expiry: Duration::minutes(expiry_minutes.max(0)),
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }
}

#[async_trait]
impl PaymentAdapter for PixAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Pix
    }

    async fn generate(&self, request: &PaymentRequest) -> Result<PaymentArtifact, PaymentError> {
        check_request(request, PaymentMethod::Pix)?;

        let payment = self.gateway.create_payment(request).await?;
        let (qr_payload, qr_image) = match (payment.qr_code, payment.qr_code_base64) {
            (Some(payload), Some(image)) if !payload.is_empty() => (payload, image),
            _ => {
                return Err(PaymentError::GenerationFailed(format!(
                    "gateway returned no QR code for payment {}",
                    payment.id
                )))
            }
        };

        let expires_at = Utc::now() + self.expiry;
        tracing::info!(
            order_id = %request.order_id,
            payment_id = %payment.id,
            amount = %request.amount,
            %expires_at,
            "PIX QR code generated"
        );

        Ok(PaymentArtifact::Pix {
            payment_id: payment.id,
            qr_payload,
            qr_image,
            expires_at,
        })
    }

    async fn verify_until(
        &self,
        payment_id: &PaymentId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PaymentStatus, PaymentError> {
        let payment = self
            .gateway
            .payment_status(payment_id, PaymentMethod::Pix)
            .await?;
        check_method(payment.method, PaymentMethod::Pix)?;

        let status = past_deadline(payment.status, expires_at);

        tracing::debug!(payment_id = %payment_id, status = status.as_str(), "PIX verified");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::OrderId;
    use crate::money::Money;
    use crate::payment::{MockPaymentGateway, SandboxGateway};

    fn request() -> PaymentRequest {
        PaymentRequest {
            order_id: OrderId::new("o1"),
            method: PaymentMethod::Pix,
            amount: Money::brl(28500),
            description: "Order o1".into(),
            payer_email: None,
            card: None,
        }
    }

    #[tokio::test]
    async fn test_generate_and_verify() {
        let gateway = Arc::new(SandboxGateway::new());
        let adapter = PixAdapter::new(gateway.clone(), 30);

        let artifact = adapter.generate(&request()).await.unwrap();
        let PaymentArtifact::Pix {
            payment_id,
            expires_at,
            ..
        } = &artifact
        else {
            panic!("expected a PIX artifact");
        };
        assert!(*expires_at > Utc::now() + Duration::minutes(29));
        assert_eq!(adapter.verify(payment_id).await.unwrap(), PaymentStatus::Pending);

        gateway.settle(payment_id);
        assert_eq!(adapter.verify(payment_id).await.unwrap(), PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn test_pending_past_expiry_reports_expired() {
        let gateway = Arc::new(SandboxGateway::new());
        let adapter = PixAdapter::new(gateway, 0);

        let artifact = adapter.generate(&request()).await.unwrap();
        assert_eq!(
            adapter
                .verify_until(artifact.payment_id(), artifact.expires_at())
                .await
                .unwrap(),
            PaymentStatus::Expired
        );
        // Without the deadline the gateway's word stands.
        assert_eq!(
            adapter.verify(artifact.payment_id()).await.unwrap(),
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_fresh_adapter_honours_recorded_deadline() {
        let gateway = Arc::new(SandboxGateway::new());
        let issuer = PixAdapter::new(gateway.clone(), 30);
        let artifact = issuer.generate(&request()).await.unwrap();

        // A restarted process only has what the order recorded.
        let restarted = PixAdapter::new(gateway, 30);
        let deadline = Utc::now() - Duration::minutes(1);
        assert_eq!(
            restarted
                .verify_until(artifact.payment_id(), Some(deadline))
                .await
                .unwrap(),
            PaymentStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_missing_qr_code_is_a_generation_failure() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_payment().returning(|req| {
            Ok(crate::payment::GatewayPayment {
                id: PaymentId::new("p1"),
                method: req.method,
                status: PaymentStatus::Pending,
                status_detail: None,
                amount: req.amount,
                qr_code: None,
                qr_code_base64: None,
                barcode: None,
                ticket_url: None,
                authorization_code: None,
                payer_email: None,
                updated_at: Utc::now(),
            })
        });

        let adapter = PixAdapter::new(Arc::new(gateway), 30);
        let err = adapter.generate(&request()).await.unwrap_err();
        assert!(matches!(err, PaymentError::GenerationFailed(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_wrong_method_rejected() {
        let adapter = PixAdapter::new(Arc::new(SandboxGateway::new()), 30);
        let mut req = request();
        req.method = PaymentMethod::Boleto;
        assert!(matches!(
            adapter.generate(&req).await,
            Err(PaymentError::MethodMismatch { .. })
        ));
    }
}
