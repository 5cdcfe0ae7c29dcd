//! Device-local key-value cache for Kickstore.
//!
//! Anonymous shoppers keep their cart on the device. This crate provides a
//! small JSON key-value store for that purpose, in memory or persisted to a
//! file, plus the random key that identifies the device.
//!
//! # Example
//!
//! ```rust,ignore
//! use kickstore_cache::{cache_key, Cache, DeviceKey};
//!
//! let cache = Cache::open("device-cache.json")?;
//! let device = DeviceKey::generate();
//!
//! cache.set(&cache_key!("cart", device), &local_cart)?;
//! let cart: Option<LocalCart> = cache.get(&cache_key!("cart", device))?;
//! cache.delete(&cache_key!("cart", device))?;
//! ```

mod device;
mod error;
mod kv;

pub use device::DeviceKey;
pub use error::CacheError;
pub use kv::Cache;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Cache, CacheError, DeviceKey};
}
