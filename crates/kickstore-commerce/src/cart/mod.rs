//! Shopping cart module.
//!
//! Contains the cart entity, its line items and live availability checks.

mod availability;
mod cart;
mod item;

pub use availability::{check_availability, check_line, AvailabilityReport, LineAvailability};
pub use cart::{Cart, CartOwner, CartStatus, MAX_QUANTITY_PER_ITEM};
pub use item::{CartItem, ItemKey, NewCartItem};
