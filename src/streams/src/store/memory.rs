use super::RegistryStore;
use crate::error::{Result, StreamsError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

/// In-process registry, loaded once from a snapshot or built in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load a JSON snapshot: a top-level object mapping registry keys to values.
    /// String values are stored verbatim; anything else is stored as compact JSON.
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let snapshot: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)
            .map_err(|e| {
                StreamsError::Store(format!("invalid snapshot {}: {}", path.display(), e))
            })?;

        let mut entries = HashMap::with_capacity(snapshot.len());
        for (key, value) in snapshot {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => serde_json::to_string(&other)?,
            };
            entries.insert(key, value);
        }

        tracing::info!(
            path = %path.display(),
            entries = entries.len(),
            "Loaded registry snapshot"
        );
        Ok(Self { entries })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_snapshot_values_normalized_to_strings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "products": ["product:talos:v1.12.0:amd64:default"],
                "product:talos:v1.12.0:amd64:default": {{"meta_hash": "aaa", "meta_size": 1024}},
                "raw": "{{\"already\":\"string\"}}"
            }}"#
        )
        .unwrap();

        let store = MemoryStore::from_json_file(file.path()).await.unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.get("products").await.unwrap().as_deref(),
            Some(r#"["product:talos:v1.12.0:amd64:default"]"#)
        );
        assert_eq!(
            store
                .get("product:talos:v1.12.0:amd64:default")
                .await
                .unwrap()
                .as_deref(),
            Some(r#"{"meta_hash":"aaa","meta_size":1024}"#)
        );
        assert_eq!(
            store.get("raw").await.unwrap().as_deref(),
            Some(r#"{"already":"string"}"#)
        );
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_snapshot_must_be_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        assert!(matches!(
            MemoryStore::from_json_file(file.path()).await,
            Err(StreamsError::Store(_))
        ));
    }
}
