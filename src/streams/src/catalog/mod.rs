//! Simplestreams catalog synthesis from the registry.

pub mod builder;
pub mod document;

pub use builder::{Built, CatalogBuilder};
pub use document::{ImagesDocument, IndexDocument, Item, Product, ProductVersion};

use crate::error::Result;
use serde::Serialize;

/// Compact JSON; clients compare these byte-for-byte with reference servers.
pub fn to_json<T: Serialize>(document: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(document)?)
}
