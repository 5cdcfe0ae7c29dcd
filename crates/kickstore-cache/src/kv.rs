//! Key-Value store wrapper with automatic serialization.

use crate::CacheError;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Type-safe cache with JSON serialization.
///
/// Provides automatic JSON serialization for any type that implements
/// `Serialize` and `DeserializeOwned`. Clones share the same entries, the
/// way every tab of a browser shares one local storage.
#[derive(Debug, Clone)]
pub struct Cache {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    entries: RwLock<BTreeMap<String, Value>>,
    path: Option<PathBuf>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Cache {
    /// Open a cache that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(BTreeMap::new()),
                path: None,
            }),
        }
    }

    /// Open a cache persisted to a JSON file, loading existing entries.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cache = Cache::open("device-cache.json")?;
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let unreadable = |reason: String| CacheError::Unreadable {
                path: path.clone(),
                reason,
            };
            let content = std::fs::read_to_string(&path).map_err(|e| unreadable(e.to_string()))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "opened device cache");
        Ok(Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(entries),
                path: Some(path),
            }),
        })
    }

    /// Get a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.inner.entries.read().get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| CacheError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Set a value in the cache.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let value = serde_json::to_value(value)?;
        let mut entries = self.inner.entries.write();
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    /// Delete a value from the cache.
    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.inner.entries.write();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    /// Check if a key exists in the cache.
    pub fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.inner.entries.read().contains_key(key))
    }

    /// Get all keys in the cache.
    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.inner.entries.read().keys().cloned().collect())
    }

    fn flush(&self, entries: &BTreeMap<String, Value>) -> Result<(), CacheError> {
        let Some(path) = &self.inner.path else {
            return Ok(());
        };
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Helper to build cache keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = cache_key!("cart", device);
/// // Returns "cart:dev_abc"
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}
