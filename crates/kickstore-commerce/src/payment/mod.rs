//! Payment method adapters.
//!
//! PIX, Boleto and credit card each implement [`PaymentAdapter`] on top of a
//! shared [`PaymentGateway`].

mod adapter;
mod boleto;
mod card;
mod error;
mod gateway;
mod pix;
mod types;

pub use adapter::{PaymentAdapter, PaymentAdapters, PaymentSettings};
pub use boleto::{business_days_after, BoletoAdapter, BoletoWebhook};
pub use card::CardAdapter;
pub use error::PaymentError;
pub use gateway::{
    GatewayPayment, MockPaymentGateway, PaymentGateway, SandboxGateway, SANDBOX_DECLINE_PREFIX,
};
pub use pix::PixAdapter;
pub use types::{CardToken, PaymentArtifact, PaymentMethod, PaymentRequest, PaymentStatus};
