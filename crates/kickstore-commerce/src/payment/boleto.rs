//! Boleto: bank slip settled asynchronously through a gateway webhook.

use crate::ids::PaymentId;
use crate::payment::adapter::{check_method, check_request, past_deadline};
use crate::payment::{
    PaymentAdapter, PaymentArtifact, PaymentError, PaymentGateway, PaymentMethod, PaymentRequest,
    PaymentStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Date `business_days` weekdays after `issued`. Weekends are skipped; bank
/// holidays are not known here.
pub fn business_days_after(issued: NaiveDate, business_days: u32) -> NaiveDate {
    let mut date = issued;
    let mut remaining = business_days;
    while remaining > 0 {
        date = date.succ_opt().unwrap_or(date);
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    date
}

/// Gateway notification about a boleto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoletoWebhook {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub received_at: DateTime<Utc>,
}

/// Boleto adapter.
///
/// Final webhook statuses wait here until the next verification picks them
/// up. Pending notifications are not kept, so verification keeps consulting
/// the gateway and the due date until something final is known.
pub struct BoletoAdapter {
    gateway: Arc<dyn PaymentGateway>,
    due_business_days: u32,
    notified: RwLock<HashMap<PaymentId, PaymentStatus>>,
}

impl BoletoAdapter {
    pub fn new(gateway: Arc<dyn PaymentGateway>, due_business_days: u32) -> Self {
        Self {
            gateway,
            due_business_days,
            notified: RwLock::new(HashMap::new()),
        }
    }

    /// Record a webhook notification. Returns the status it carried.
    ///
    /// Notifications for boletos this adapter never issued are accepted; a
    /// pending notification never overwrites a final status.
    pub fn apply_webhook(&self, webhook: &BoletoWebhook) -> PaymentStatus {
        let mut notified = self.notified.write();
        let status = if webhook.status.is_final() {
            notified.insert(webhook.payment_id.clone(), webhook.status);
            webhook.status
        } else {
            notified
                .get(&webhook.payment_id)
                .copied()
                .unwrap_or(webhook.status)
        };

        tracing::info!(
            payment_id = %webhook.payment_id,
            status = status.as_str(),
            "boleto webhook applied"
        );
        status
    }
}

#[async_trait]
impl PaymentAdapter for BoletoAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Boleto
    }

    async fn generate(&self, request: &PaymentRequest) -> Result<PaymentArtifact, PaymentError> {
        check_request(request, PaymentMethod::Boleto)?;

        let payment = self.gateway.create_payment(request).await?;
        let (barcode, document_url) = match (payment.barcode, payment.ticket_url) {
            (Some(barcode), Some(url)) if !barcode.is_empty() => (barcode, url),
            _ => {
                return Err(PaymentError::GenerationFailed(format!(
                    "gateway returned no barcode for payment {}",
                    payment.id
                )))
            }
        };

        let due_date = business_days_after(Utc::now().date_naive(), self.due_business_days);
        let expires_at = due_date.and_time(NaiveTime::MIN).and_utc() + chrono::Duration::days(1);
        tracing::info!(
            order_id = %request.order_id,
            payment_id = %payment.id,
            %due_date,
            "boleto issued"
        );

        Ok(PaymentArtifact::Boleto {
            payment_id: payment.id,
            barcode,
            document_url,
            due_date,
            expires_at,
        })
    }

    async fn verify_until(
        &self,
        payment_id: &PaymentId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PaymentStatus, PaymentError> {
        if let Some(status) = self.notified.write().remove(payment_id) {
            return Ok(status);
        }

        let payment = self
            .gateway
            .payment_status(payment_id, PaymentMethod::Boleto)
            .await?;
        check_method(payment.method, PaymentMethod::Boleto)?;
        Ok(past_deadline(payment.status, expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::OrderId;
    use crate::money::Money;
    use crate::payment::SandboxGateway;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_business_days_skip_weekends() {
        // Thursday + 3 business days = Tuesday
        assert_eq!(business_days_after(date(2026, 10, 15), 3), date(2026, 10, 20));
        // Friday + 1 = Monday
        assert_eq!(business_days_after(date(2026, 10, 16), 1), date(2026, 10, 19));
        // Saturday + 0 stays put
        assert_eq!(business_days_after(date(2026, 10, 17), 0), date(2026, 10, 17));
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            order_id: OrderId::new("o1"),
            method: PaymentMethod::Boleto,
            amount: Money::brl(32000),
            description: "Order o1".into(),
            payer_email: Some("ana@example.com".into()),
            card: None,
        }
    }

    #[tokio::test]
    async fn test_generate_sets_due_date() {
        let adapter = BoletoAdapter::new(Arc::new(SandboxGateway::new()), 3);
        let artifact = adapter.generate(&request()).await.unwrap();
        let PaymentArtifact::Boleto {
            due_date,
            expires_at,
            ..
        } = artifact
        else {
            panic!("expected a boleto artifact");
        };
        assert_eq!(
            due_date,
            business_days_after(Utc::now().date_naive(), 3)
        );
        assert!(expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_webhook_settles_without_gateway_call() {
        let gateway = Arc::new(SandboxGateway::new());
        let adapter = BoletoAdapter::new(gateway.clone(), 3);
        let artifact = adapter.generate(&request()).await.unwrap();
        let id = artifact.payment_id().clone();

        assert_eq!(adapter.verify(&id).await.unwrap(), PaymentStatus::Pending);

        let status = adapter.apply_webhook(&BoletoWebhook {
            payment_id: id.clone(),
            status: PaymentStatus::Approved,
            received_at: Utc::now(),
        });
        assert_eq!(status, PaymentStatus::Approved);
        // The gateway still says pending; the webhook wins.
        assert_eq!(adapter.verify(&id).await.unwrap(), PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn test_pending_webhook_still_consults_gateway() {
        let gateway = Arc::new(SandboxGateway::new());
        let adapter = BoletoAdapter::new(gateway.clone(), 3);
        let artifact = adapter.generate(&request()).await.unwrap();
        let id = artifact.payment_id().clone();

        let status = adapter.apply_webhook(&BoletoWebhook {
            payment_id: id.clone(),
            status: PaymentStatus::Pending,
            received_at: Utc::now(),
        });
        assert_eq!(status, PaymentStatus::Pending);

        gateway.settle(&id);
        assert_eq!(adapter.verify(&id).await.unwrap(), PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn test_pending_past_due_date_expires() {
        let adapter = BoletoAdapter::new(Arc::new(SandboxGateway::new()), 3);
        let artifact = adapter.generate(&request()).await.unwrap();
        let id = artifact.payment_id().clone();
        adapter.apply_webhook(&BoletoWebhook {
            payment_id: id.clone(),
            status: PaymentStatus::Pending,
            received_at: Utc::now(),
        });

        let overdue = Utc::now() - chrono::Duration::days(1);
        assert_eq!(
            adapter.verify_until(&id, Some(overdue)).await.unwrap(),
            PaymentStatus::Expired
        );
        assert_eq!(
            adapter.verify_until(&id, artifact.expires_at()).await.unwrap(),
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_final_webhook_is_consumed_by_verify() {
        let adapter = BoletoAdapter::new(Arc::new(SandboxGateway::new()), 3);
        let artifact = adapter.generate(&request()).await.unwrap();
        let id = artifact.payment_id().clone();
        adapter.apply_webhook(&BoletoWebhook {
            payment_id: id.clone(),
            status: PaymentStatus::Approved,
            received_at: Utc::now(),
        });

        assert_eq!(adapter.verify(&id).await.unwrap(), PaymentStatus::Approved);
        assert!(adapter.notified.read().is_empty());
    }

    #[tokio::test]
    async fn test_late_pending_webhook_does_not_reopen() {
        let adapter = BoletoAdapter::new(Arc::new(SandboxGateway::new()), 3);
        let id = PaymentId::new("b1");
        adapter.apply_webhook(&BoletoWebhook {
            payment_id: id.clone(),
            status: PaymentStatus::Expired,
            received_at: Utc::now(),
        });
        let status = adapter.apply_webhook(&BoletoWebhook {
            payment_id: id,
            status: PaymentStatus::Pending,
            received_at: Utc::now(),
        });
        assert_eq!(status, PaymentStatus::Expired);
    }
}
