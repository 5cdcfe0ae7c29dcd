//! `POST /payments/payment` and `GET /payments/:id/status`.
//!
//! The backend proxies a MercadoPago-style gateway; statuses and
//! transaction data keep the gateway's vocabulary on the wire.

use crate::wire::{from_reais, to_reais};
use crate::{ApiClient, ApiError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kickstore_commerce::ids::PaymentId;
use kickstore_commerce::payment::{
    GatewayPayment, PaymentError, PaymentGateway, PaymentMethod, PaymentRequest, PaymentStatus,
};
use kickstore_commerce::Currency;
use serde::{Deserialize, Serialize};

/// `POST /payments/payment` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentBody {
    pub order_id: String,
    pub payment_method_id: String,
    pub transaction_amount: f64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
}

impl From<&PaymentRequest> for CreatePaymentBody {
    fn from(request: &PaymentRequest) -> Self {
        let method_id = match request.method {
            PaymentMethod::Pix => "pix".to_string(),
            PaymentMethod::Boleto => "bolbradesco".to_string(),
            PaymentMethod::CreditCard => request
                .card
                .as_ref()
                .and_then(|c| c.brand.clone())
                .unwrap_or_else(|| "credit_card".to_string()),
        };
        Self {
            order_id: request.order_id.to_string(),
            payment_method_id: method_id,
            transaction_amount: to_reais(&request.amount),
            description: request.description.clone(),
            payer_email: request.payer_email.clone(),
            token: request.card.as_ref().map(|c| c.token.clone()),
            installments: request.card.as_ref().map(|c| c.installments),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionDataDto {
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub qr_code_base64: Option<String>,
    #[serde(default)]
    pub ticket_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PointOfInteractionDto {
    #[serde(default)]
    pub transaction_data: TransactionDataDto,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionDetailsDto {
    #[serde(default)]
    pub external_resource_url: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

/// A payment as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentDto {
    pub id: serde_json::Value,
    pub status: String,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub transaction_amount: f64,
    #[serde(default)]
    pub point_of_interaction: PointOfInteractionDto,
    #[serde(default)]
    pub transaction_details: TransactionDetailsDto,
    #[serde(default)]
    pub authorization_code: Option<String>,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub date_last_updated: Option<DateTime<Utc>>,
}

/// Gateway status vocabulary.
pub fn payment_status(status: &str) -> PaymentStatus {
    match status {
        "approved" | "authorized" => PaymentStatus::Approved,
        "rejected" => PaymentStatus::Declined,
        "cancelled" | "refunded" | "charged_back" => PaymentStatus::Cancelled,
        "expired" => PaymentStatus::Expired,
        _ => PaymentStatus::Pending,
    }
}

impl PaymentDto {
    /// Gateway ids arrive as numbers or strings.
    fn payment_id(&self) -> PaymentId {
        match &self.id {
            serde_json::Value::String(s) => PaymentId::new(s.as_str()),
            other => PaymentId::new(other.to_string()),
        }
    }

    pub fn into_gateway_payment(self, fallback_method: PaymentMethod) -> GatewayPayment {
        let method = self
            .payment_method_id
            .as_deref()
            .and_then(PaymentMethod::from_code)
            .unwrap_or(fallback_method);
        let id = self.payment_id();
        let data = self.point_of_interaction.transaction_data;
        let details = self.transaction_details;
        GatewayPayment {
            id,
            method,
            status: payment_status(&self.status),
            status_detail: self.status_detail,
            amount: from_reais(self.transaction_amount, Currency::default()),
            qr_code: data.qr_code,
            qr_code_base64: data.qr_code_base64,
            barcode: details.barcode,
            ticket_url: details.external_resource_url.or(data.ticket_url),
            authorization_code: self.authorization_code,
            payer_email: self.payer_email,
            updated_at: self.date_last_updated.unwrap_or_else(Utc::now),
        }
    }
}

/// Payment gateway reached through the storefront API.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: ApiClient,
}

impl HttpPaymentGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub(crate) fn status_path(payment_id: &PaymentId) -> String {
        format!("/payments/{}/status", payment_id)
    }
}

fn unknown_as(e: ApiError, payment_id: &PaymentId) -> PaymentError {
    if e.is_not_found() {
        PaymentError::UnknownPayment(payment_id.to_string())
    } else {
        e.into()
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<GatewayPayment, PaymentError> {
        let body = CreatePaymentBody::from(request);
        let dto: PaymentDto = self.client.post("/payments/payment", &body).await?;
        let payment = dto.into_gateway_payment(request.method);
        tracing::info!(
            order_id = %request.order_id,
            payment_id = %payment.id,
            method = %payment.method,
            status = payment.status.as_str(),
            "payment created"
        );
        Ok(payment)
    }

    async fn payment_status(
        &self,
        payment_id: &PaymentId,
        method: PaymentMethod,
    ) -> Result<GatewayPayment, PaymentError> {
        let dto: PaymentDto = self
            .client
            .get(&Self::status_path(payment_id))
            .await
            .map_err(|e| unknown_as(e, payment_id))?;
        // Status replies often omit the method.
        Ok(dto.into_gateway_payment(method))
    }
}
