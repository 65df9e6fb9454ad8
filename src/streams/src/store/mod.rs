//! Read-only access to the key-value registry the release pipeline writes.

pub mod http;
pub mod memory;

pub use http::HttpKvStore;
pub use memory::MemoryStore;

use crate::error::{Result, StreamsError};
use async_trait::async_trait;

/// Registry key holding the JSON array of every published storage key.
pub const PRODUCT_SET_KEY: &str = "products";

#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Raw value at `key`, or `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Read the product key set. A missing set is an empty catalog; a set that is
/// not a JSON array of strings is corrupt.
pub async fn read_product_keys(store: &dyn RegistryStore) -> Result<Vec<String>> {
    match store.get(PRODUCT_SET_KEY).await? {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str::<Vec<String>>(&raw).map_err(|e| {
            StreamsError::DataCorruption(format!("{}: {}", PRODUCT_SET_KEY, e))
        }),
    }
}
