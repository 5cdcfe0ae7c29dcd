//! Payment error types.

use thiserror::Error;

/// Failures reported by payment adapters and the gateway behind them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// The card issuer refused the capture.
    #[error("Card declined: {reason}")]
    Declined { reason: String },

    /// The gateway accepted the request but returned no usable artifact.
    #[error("Payment artifact generation failed: {0}")]
    GenerationFailed(String),

    /// The gateway did not answer in time.
    #[error("Payment gateway timeout: {0}")]
    Timeout(String),

    /// The gateway answered with an error.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// No payment with this id is known.
    #[error("Unknown payment: {0}")]
    UnknownPayment(String),

    /// A card payment was submitted without a tokenized card.
    #[error("Card payment requires a card token")]
    MissingCardToken,

    /// Amount must be positive.
    #[error("Invalid payment amount: {0} cents")]
    InvalidAmount(i64),

    /// The payment belongs to another method.
    #[error("Payment method mismatch: expected {expected}, got {got}")]
    MethodMismatch {
        expected: &'static str,
        got: &'static str,
    },
}

impl PaymentError {
    /// Whether an explicit user retry of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::GenerationFailed(_)
                | PaymentError::Timeout(_)
                | PaymentError::Gateway(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decline_is_not_retryable() {
        assert!(!PaymentError::Declined {
            reason: "insufficient funds".into()
        }
        .is_retryable());
        assert!(PaymentError::Timeout("30s".into()).is_retryable());
        assert!(PaymentError::GenerationFailed("no qr".into()).is_retryable());
    }
}
