//! Delivery address.

use crate::ids::AddressId;
use serde::{Deserialize, Serialize};

/// A Brazilian postal address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// Address ID (None for unsaved addresses).
    pub id: Option<AddressId>,
    /// Recipient name.
    pub recipient: String,
    pub street: String,
    pub number: String,
    /// Apartment, block, etc.
    pub complement: Option<String>,
    /// Bairro.
    pub neighborhood: String,
    pub city: String,
    /// Two-letter state code (e.g., "SP").
    pub state: String,
    /// CEP, digits only once normalized.
    pub zip: String,
    pub phone: Option<String>,
}

impl Address {
    /// Create a new address.
    pub fn new(
        recipient: impl Into<String>,
        street: impl Into<String>,
        number: impl Into<String>,
        neighborhood: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            recipient: recipient.into(),
            street: street.into(),
            number: number.into(),
            complement: None,
            neighborhood: neighborhood.into(),
            city: city.into(),
            state: state.into().trim().to_uppercase(),
            zip: normalize_zip(&zip.into()),
            phone: None,
        }
    }

    pub fn with_id(mut self, id: AddressId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_complement(mut self, complement: impl Into<String>) -> Self {
        self.complement = Some(complement.into());
        self
    }

    /// CEP formatted as `00000-000`.
    pub fn formatted_zip(&self) -> String {
        if self.zip.len() == 8 {
            format!("{}-{}", &self.zip[..5], &self.zip[5..])
        } else {
            self.zip.clone()
        }
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        let mut street = format!("{}, {}", self.street, self.number);
        if let Some(ref complement) = self.complement {
            street.push_str(" - ");
            street.push_str(complement);
        }
        format!(
            "{}, {}, {}/{}, {}",
            street,
            self.neighborhood,
            self.city,
            self.state,
            self.formatted_zip()
        )
    }

    /// Check if address is complete enough to ship to.
    pub fn is_complete(&self) -> bool {
        let filled = |s: &str| !s.trim().is_empty();
        filled(&self.recipient)
            && filled(&self.street)
            && filled(&self.number)
            && filled(&self.neighborhood)
            && filled(&self.city)
            && self.state.len() == 2
            && self.zip.len() == 8
    }
}

fn normalize_zip(zip: &str) -> String {
    zip.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address::new(
            "Ana Souza",
            "Rua Augusta",
            "1500",
            "Consolação",
            "São Paulo",
            "sp",
            "01304-001",
        )
    }

    #[test]
    fn test_address_creation() {
        let addr = address();
        assert_eq!(addr.state, "SP");
        assert_eq!(addr.zip, "01304001");
        assert!(addr.is_complete());
    }

    #[test]
    fn test_address_formatting() {
        let addr = address().with_complement("ap 12");
        assert_eq!(
            addr.one_line(),
            "Rua Augusta, 1500 - ap 12, Consolação, São Paulo/SP, 01304-001"
        );
    }

    #[test]
    fn test_incomplete_address() {
        let mut addr = address();
        addr.number = " ".into();
        assert!(!addr.is_complete());
        assert!(!Address::default().is_complete());
    }
}
