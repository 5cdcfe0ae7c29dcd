//! Anonymous device identity.

use serde::{Deserialize, Serialize};

/// Key identifying an anonymous device; anonymous carts are stored under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceKey(String);

impl DeviceKey {
    /// Create a device key from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random device key.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("dev_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Get the device key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_key_generate_format() {
        let key = DeviceKey::generate();
        assert!(key.as_str().starts_with("dev_"));
        // 18 bytes -> 24 base64 chars
        assert_eq!(key.as_str().len(), 28);
    }

    #[test]
    fn test_device_key_uniqueness() {
        assert_ne!(DeviceKey::generate(), DeviceKey::generate());
    }

    #[test]
    fn test_device_key_serialization() {
        let key = DeviceKey::new("dev_abc");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#""dev_abc""#);
    }
}
