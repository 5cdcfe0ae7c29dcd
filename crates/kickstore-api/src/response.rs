//! Response decoding.

use crate::ApiError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Error body the API sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Decode a 2xx JSON body, or turn the response into [`ApiError::Http`].
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    decode(status, &body)
}

pub(crate) fn decode<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, ApiError> {
    if !(200..300).contains(&status) {
        return Err(ApiError::Http {
            status,
            message: error_message(body),
        });
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Best-effort reason from an error body.
pub(crate) fn error_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        if let Some(message) = parsed.message.or(parsed.error) {
            return message;
        }
    }
    match std::str::from_utf8(body) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => "Unknown error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_success_decodes() {
        let value: Value = decode(200, br#"{"ok":true}"#).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_error_status_carries_message() {
        let err = decode::<Value>(404, br#"{"message":"Cart item not found"}"#).unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: 404,
                message: "Cart item not found".into()
            }
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message(br#"{"error":"Coupon expired"}"#), "Coupon expired");
        assert_eq!(error_message(b"Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(b""), "Unknown error");
    }

    #[test]
    fn test_bad_body_is_parse_error() {
        assert!(matches!(
            decode::<Value>(200, b"<html>"),
            Err(ApiError::Parse(_))
        ));
    }
}
