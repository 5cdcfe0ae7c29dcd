//! Payment requests, artifacts and statuses.

use crate::ids::{OrderId, PaymentId};
use crate::money::Money;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Instant bank transfer confirmed through a QR code.
    Pix,
    /// Bank slip settled days later.
    Boleto,
    /// Synchronous card capture.
    CreditCard,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::CreditCard => "credit_card",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "PIX",
            PaymentMethod::Boleto => "Boleto",
            PaymentMethod::CreditCard => "Credit Card",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pix" => Some(PaymentMethod::Pix),
            "boleto" | "bolbradesco" => Some(PaymentMethod::Boleto),
            "credit_card" | "card" => Some(PaymentMethod::CreditCard),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Artifact issued, waiting for the payer.
    #[default]
    Pending,
    /// Money received.
    Approved,
    /// Refused by the issuer.
    Declined,
    /// Not paid before the artifact expired.
    Expired,
    /// Voided by the gateway.
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Declined => "declined",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// No further status change is expected.
    pub fn is_final(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, PaymentStatus::Approved)
    }
}

/// Tokenized card reference produced by the gateway's client-side widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardToken {
    pub token: String,
    pub last_four: String,
    pub brand: Option<String>,
    #[serde(default = "default_installments")]
    pub installments: u32,
}

fn default_installments() -> u32 {
    1
}

impl CardToken {
    pub fn new(token: impl Into<String>, last_four: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            last_four: last_four.into(),
            brand: None,
            installments: 1,
        }
    }
}

/// What an adapter needs to charge an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub method: PaymentMethod,
    /// Amount to charge, after every discount.
    pub amount: Money,
    pub description: String,
    pub payer_email: Option<String>,
    pub card: Option<CardToken>,
}

/// Method-specific output of `generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentArtifact {
    Pix {
        payment_id: PaymentId,
        /// Copy-and-paste payload encoded in the QR code.
        qr_payload: String,
        /// Base64 QR image.
        qr_image: String,
        expires_at: DateTime<Utc>,
    },
    Boleto {
        payment_id: PaymentId,
        barcode: String,
        document_url: String,
        due_date: NaiveDate,
        expires_at: DateTime<Utc>,
    },
    CreditCard {
        payment_id: PaymentId,
        last_four: String,
        status: PaymentStatus,
        authorization_code: Option<String>,
    },
}

impl PaymentArtifact {
    pub fn payment_id(&self) -> &PaymentId {
        match self {
            PaymentArtifact::Pix { payment_id, .. }
            | PaymentArtifact::Boleto { payment_id, .. }
            | PaymentArtifact::CreditCard { payment_id, .. } => payment_id,
        }
    }

    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentArtifact::Pix { .. } => PaymentMethod::Pix,
            PaymentArtifact::Boleto { .. } => PaymentMethod::Boleto,
            PaymentArtifact::CreditCard { .. } => PaymentMethod::CreditCard,
        }
    }

    /// Moment after which an unpaid artifact is void. Card captures never expire.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            PaymentArtifact::Pix { expires_at, .. }
            | PaymentArtifact::Boleto { expires_at, .. } => Some(*expires_at),
            PaymentArtifact::CreditCard { .. } => None,
        }
    }

    /// Status known at generation time.
    pub fn initial_status(&self) -> PaymentStatus {
        match self {
            PaymentArtifact::CreditCard { status, .. } => *status,
            _ => PaymentStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!(PaymentMethod::from_code("PIX"), Some(PaymentMethod::Pix));
        assert_eq!(PaymentMethod::from_code("card"), Some(PaymentMethod::CreditCard));
        assert_eq!(PaymentMethod::from_code("cash"), None);
        assert_eq!(
            serde_json::to_string(&PaymentMethod::CreditCard).unwrap(),
            r#""credit_card""#
        );
    }

    #[test]
    fn test_card_artifact_has_no_expiry() {
        let artifact = PaymentArtifact::CreditCard {
            payment_id: PaymentId::new("p1"),
            last_four: "4242".into(),
            status: PaymentStatus::Approved,
            authorization_code: Some("A1".into()),
        };
        assert_eq!(artifact.expires_at(), None);
        assert_eq!(artifact.initial_status(), PaymentStatus::Approved);
        assert_eq!(artifact.method(), PaymentMethod::CreditCard);
    }
}
