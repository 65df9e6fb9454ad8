use crate::error::{Result, StreamsError};
use serde::{Deserialize, Serialize};

/// Stored facts about one published image variant.
///
/// Written by the release pipeline as a JSON object; decoding is strict so a
/// record missing any hash or size never reaches the catalog or the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Seconds since the epoch. Absent means "now" when deriving the version key.
    #[serde(default)]
    pub creation_date: Option<i64>,
    pub meta_hash: String,
    pub meta_size: u64,
    pub disk_hash: String,
    pub disk_size: u64,
    /// sha256 over metadata tarball followed by disk image.
    pub combined_hash: String,
    /// Explicit origin for the disk image; wins over the default template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Image-factory schematic id used when `source_url` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schematic: Option<String>,
    /// Release repository for the metadata tarball. Defaults to the product name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Release asset filename prefix. Defaults to the product name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl MetadataRecord {
    /// Decode a registry value; `key` only feeds the error message.
    pub fn decode(key: &str, raw: &str) -> Result<Self> {
        let record: MetadataRecord = serde_json::from_str(raw)
            .map_err(|e| StreamsError::DataCorruption(format!("{}: {}", key, e)))?;

        if record.meta_hash.is_empty() || record.disk_hash.is_empty() {
            return Err(StreamsError::DataCorruption(format!(
                "{}: empty artifact hash",
                key
            )));
        }
        Ok(record)
    }
}
