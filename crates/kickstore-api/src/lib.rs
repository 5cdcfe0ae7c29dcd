//! HTTP adapters for the Kickstore storefront API.
//!
//! Each collaborator trait of `kickstore-commerce` gets a reqwest-backed
//! implementation sharing one [`ApiClient`]:
//!
//! - [`HttpCartApi`]: server cart of the authenticated user
//! - [`HttpOrders`]: order persistence and history
//! - [`HttpCoupons`]: coupon validation
//! - [`HttpPaymentGateway`]: payment creation and status polling
//!
//! # Example
//!
//! ```rust,ignore
//! use kickstore_api::HttpBackend;
//!
//! let backend = HttpBackend::from_config(&config.api)?.with_bearer_token(token);
//! let cart = backend.carts.fetch_cart(&user_id).await?;
//! ```

mod client;
mod error;
mod response;

pub mod carts;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod wire;

pub use carts::HttpCartApi;
pub use client::ApiClient;
pub use coupons::HttpCoupons;
pub use error::ApiError;
pub use orders::HttpOrders;
pub use payments::HttpPaymentGateway;

use kickstore_commerce::config::ApiConfig;
use std::sync::Arc;

/// Every HTTP collaborator, wired to one client.
#[derive(Clone)]
pub struct HttpBackend {
    pub client: ApiClient,
    pub carts: Arc<HttpCartApi>,
    pub orders: Arc<HttpOrders>,
    pub coupons: Arc<HttpCoupons>,
    pub payments: Arc<HttpPaymentGateway>,
}

impl HttpBackend {
    pub fn new(client: ApiClient) -> Self {
        Self {
            carts: Arc::new(HttpCartApi::new(client.clone())),
            orders: Arc::new(HttpOrders::new(client.clone())),
            coupons: Arc::new(HttpCoupons::new(client.clone())),
            payments: Arc::new(HttpPaymentGateway::new(client.clone())),
            client,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Ok(Self::new(ApiClient::from_config(config)?))
    }

    /// Rebuild every adapter with the session's bearer token.
    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        Self::new(self.client.with_bearer_token(token))
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ApiClient, ApiError, HttpBackend, HttpCartApi, HttpCoupons, HttpOrders,
        HttpPaymentGateway,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_shares_base_url() {
        let backend = HttpBackend::new(ApiClient::new("https://api.kickstore.dev/api").unwrap())
            .with_bearer_token("jwt");
        assert_eq!(backend.client.base_url(), "https://api.kickstore.dev/api");
    }
}
