//! Checkout module.
//!
//! Contains the checkout flow, addresses, shipping, pricing, the order state
//! machine and the orchestrator that ties them to the cart and payments.

mod address;
mod flow;
mod history;
mod orchestrator;
mod order;
mod quote;
mod repository;
mod shipping;

pub use address::Address;
pub use flow::{CheckoutFlow, CheckoutStep};
pub use history::OrderHistory;
pub use orchestrator::{CheckoutOrchestrator, PAYMENT_EXPIRED_REASON};
pub use order::{NewOrder, Order, OrderItem, OrderStatus, PaymentResult};
pub use quote::{quote, CheckoutQuote};
pub use repository::{InMemoryOrders, MockOrderRepository, OrderRepository};
pub use shipping::{DeliveryWindow, ShippingMethod, ShippingSelection};
