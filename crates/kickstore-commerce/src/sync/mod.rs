//! Cart synchronization.
//!
//! Anonymous carts live in the device-local cache; authenticated carts live
//! on the server. [`CartSession`] routes each mutation to the right place and
//! [`SyncEngine`] moves the device cart into the server cart on login.

mod engine;
mod local;
mod remote;
mod session;

pub use engine::{FailedTransfer, MergeOutcome, MergeReport, SyncEngine};
pub use local::{LocalCart, LocalCartItem, LocalCartStore};
pub use remote::{CartApi, InMemoryCartServer, MockCartApi};
pub use session::{CartSession, SessionDeps};
