//! # Durable Storage
//!
//! Key/value storage that survives restarts, the native counterpart of a browser's
//! local storage. The guest cart and the bearer tokens live here.
//!
//! - [`DurableStore`] - the port the providers and the gateway depend on
//! - [`MemoryStore`] - in-process store (tests, ephemeral sessions)
//! - [`FileStore`] - one file per key under a data directory

pub mod file;
pub mod memory;

pub use file::*;
pub use memory::*;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Key of the guest cart entry.
pub const CART_KEY: &str = "cart";
/// Key of the access token entry.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Key of the refresh token entry.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Errors that can occur while reading or writing durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying medium failed (disk full, permissions, quota).
    #[error("Storage I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored entry could not be parsed.
    #[error("Corrupt entry '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded for storage.
    #[error("Could not encode entry '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The store refused the write.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// String key/value storage that outlives the process.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Reads and decodes a JSON entry. A missing key yields `Ok(None)`.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn DurableStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })
}

/// Encodes `value` as JSON and writes it under `key`.
pub async fn save_json<T: Serialize + Sync>(
    store: &dyn DurableStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CartSnapshot;

    #[tokio::test]
    async fn test_json_helpers_round_trip_through_store() {
        let store = MemoryStore::new();
        assert!(load_json::<CartSnapshot>(&store, CART_KEY).await.unwrap().is_none());

        save_json(&store, CART_KEY, &CartSnapshot::default()).await.unwrap();
        let loaded: Option<CartSnapshot> = load_json(&store, CART_KEY).await.unwrap();
        assert_eq!(loaded, Some(CartSnapshot::default()));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_reported() {
        let store = MemoryStore::new();
        store.set(CART_KEY, "{not json").await.unwrap();

        let err = load_json::<CartSnapshot>(&store, CART_KEY).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { ref key, .. } if key == CART_KEY));
    }
}
