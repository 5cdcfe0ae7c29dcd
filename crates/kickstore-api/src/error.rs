//! HTTP client error types.

use kickstore_commerce::payment::PaymentError;
use kickstore_commerce::CommerceError;
use thiserror::Error;

/// Errors that can occur when calling the storefront API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Failed to send the request.
    #[error("Request failed: {0}")]
    Request(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP error response.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Failed to parse response body.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Request timeout.
    #[error("Request timed out")]
    Timeout,

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Network failures, timeouts and 5xx responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Request(_) | ApiError::Timeout => true,
            ApiError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Human-readable reason, without the status prefix.
    pub fn reason(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Parse(e.to_string())
        } else if e.is_builder() {
            ApiError::InvalidUrl(e.to_string())
        } else {
            ApiError::Request(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Json(e.to_string())
    }
}

impl From<ApiError> for CommerceError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Parse(message) | ApiError::Json(message) => {
                CommerceError::Serialization(message)
            }
            ApiError::InvalidUrl(message) => CommerceError::Config(message),
            other => CommerceError::Transport(other.to_string()),
        }
    }
}

impl From<ApiError> for PaymentError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Timeout => PaymentError::Timeout("payment gateway".to_string()),
            other => PaymentError::Gateway(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kickstore_commerce::ErrorKind;

    #[test]
    fn test_retryable_statuses() {
        assert!(ApiError::Timeout.is_retryable());
        assert!(ApiError::Http { status: 503, message: "down".into() }.is_retryable());
        assert!(!ApiError::Http { status: 400, message: "bad".into() }.is_retryable());
        assert!(!ApiError::Json("eof".into()).is_retryable());
    }

    #[test]
    fn test_commerce_mapping() {
        let transport: CommerceError = ApiError::Http {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert_eq!(transport.kind(), ErrorKind::Transient);
        assert!(transport.is_retryable());

        let parse: CommerceError = ApiError::Parse("expected value".into()).into();
        assert_eq!(parse.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn test_payment_mapping() {
        let timeout: PaymentError = ApiError::Timeout.into();
        assert!(matches!(timeout, PaymentError::Timeout(_)));
        assert!(timeout.is_retryable());
    }
}
