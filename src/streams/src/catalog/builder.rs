use super::document::{ImagesDocument, IndexDocument, Item, Product, ProductVersion};
use crate::codec::{download_path, version_key, ArtifactFile, ProductKey};
use crate::error::{Result, StreamsError};
use crate::record::MetadataRecord;
use crate::store::{read_product_keys, RegistryStore};
use futures::future::join_all;
use indexmap::IndexSet;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A catalog document plus how many registry entries were dropped building it.
#[derive(Debug, Clone)]
pub struct Built<T> {
    pub document: T,
    pub skipped: usize,
}

/// Builds the index and images documents from the registry on every call.
#[derive(Clone)]
pub struct CatalogBuilder {
    store: Arc<dyn RegistryStore>,
}

impl CatalogBuilder {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self { store }
    }

    /// One registry read: the product key set.
    pub async fn build_index(&self) -> Result<Built<IndexDocument>> {
        let keys = read_product_keys(self.store.as_ref()).await?;

        let mut skipped = 0;
        let mut products = IndexSet::with_capacity(keys.len());
        for key in &keys {
            match ProductKey::from_storage_key(key) {
                Some(product) => {
                    products.insert(product.wire_key());
                }
                None => {
                    tracing::warn!(key = %key, "Skipping malformed product key");
                    skipped += 1;
                }
            }
        }

        tracing::debug!(
            products = products.len(),
            skipped = skipped,
            "Built simplestreams index"
        );
        Ok(Built {
            document: IndexDocument::new(products.into_iter().collect()),
            skipped,
        })
    }

    /// One read for the key set, then one per product. Lookups run
    /// concurrently; results are folded in key-set order.
    ///
    /// Output is byte-identical across calls over an unchanged registry, except
    /// for records without `creation_date`: their version key is the current
    /// minute, so it moves between builds that straddle a minute boundary.
    pub async fn build_images(&self) -> Result<Built<ImagesDocument>> {
        let keys = read_product_keys(self.store.as_ref()).await?;

        let lookups = keys.iter().map(|key| self.resolve(key));
        let resolved = join_all(lookups).await;

        let mut skipped = 0;
        let mut document = ImagesDocument::default();
        for entry in resolved {
            match entry {
                Some((product, record)) => add_product(&mut document, &product, &record),
                None => skipped += 1,
            }
        }

        tracing::debug!(
            products = document.products.len(),
            skipped = skipped,
            "Built simplestreams images catalog"
        );
        Ok(Built { document, skipped })
    }

    /// Parse one key and load its record. `None` for anything that should be
    /// left out of the catalog; the reason is logged here.
    async fn resolve(&self, key: &str) -> Option<(ProductKey, MetadataRecord)> {
        let Some(product) = ProductKey::from_storage_key(key) else {
            tracing::warn!(key = %key, "Skipping malformed product key");
            return None;
        };

        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::warn!(key = %key, "Product listed but has no metadata record");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read metadata record");
                return None;
            }
        };

        match MetadataRecord::decode(key, &raw) {
            Ok(record) => Some((product, record)),
            Err(e @ StreamsError::DataCorruption(_)) => {
                tracing::error!(key = %key, error_class = e.class(), error = %e, "Skipping corrupt metadata record");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Skipping unreadable metadata record");
                None
            }
        }
    }
}

fn add_product(document: &mut ImagesDocument, product: &ProductKey, record: &MetadataRecord) {
    let vkey = version_key(record.creation_date);

    let entry = document
        .products
        .entry(product.wire_key())
        .or_insert_with(|| Product {
            aliases: aliases(product),
            arch: product.arch.clone(),
            os: display_name(&product.os),
            release: product.version.clone(),
            release_title: product.version.clone(),
            requirements: BTreeMap::new(),
            variant: product.variant.clone(),
            versions: Default::default(),
        });

    entry
        .versions
        .insert(vkey.clone(), version_items(product, &vkey, record));
}

fn version_items(product: &ProductKey, vkey: &str, record: &MetadataRecord) -> ProductVersion {
    let metadata_item = |file: ArtifactFile| Item {
        ftype: file.ftype().to_string(),
        sha256: record.meta_hash.clone(),
        size: record.meta_size,
        path: download_path(product, vkey, file.filename()),
        combined_disk_kvm_img_sha256: Some(record.combined_hash.clone()),
    };

    let mut version = ProductVersion::default();
    version.items.insert(
        ArtifactFile::IncusMetadata.filename().to_string(),
        metadata_item(ArtifactFile::IncusMetadata),
    );
    version.items.insert(
        ArtifactFile::DiskQcow2.filename().to_string(),
        Item {
            ftype: ArtifactFile::DiskQcow2.ftype().to_string(),
            sha256: record.disk_hash.clone(),
            size: record.disk_size,
            path: download_path(product, vkey, ArtifactFile::DiskQcow2.filename()),
            combined_disk_kvm_img_sha256: None,
        },
    );
    version.items.insert(
        ArtifactFile::LxdMetadata.filename().to_string(),
        metadata_item(ArtifactFile::LxdMetadata),
    );
    version
}

/// `os/version/arch/variant`, plus the shorter forms for the default variant.
fn aliases(product: &ProductKey) -> String {
    let mut aliases = vec![format!(
        "{}/{}/{}/{}",
        product.os, product.version, product.arch, product.variant
    )];
    if product.variant == "default" {
        aliases.push(format!("{}/{}/{}", product.os, product.version, product.arch));
        aliases.push(format!("{}/{}", product.os, product.version));
    }
    aliases.join(",")
}

fn display_name(os: &str) -> String {
    let mut chars = os.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_default_variant() {
        let key = ProductKey::new("talos", "v1.12.0", "amd64", "default");
        assert_eq!(
            aliases(&key),
            "talos/v1.12.0/amd64/default,talos/v1.12.0/amd64,talos/v1.12.0"
        );
    }

    #[test]
    fn test_aliases_non_default_variant() {
        let key = ProductKey::new("talos", "v1.12.0", "arm64", "nvidia");
        assert_eq!(aliases(&key), "talos/v1.12.0/arm64/nvidia");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("talos"), "Talos");
        assert_eq!(display_name("Talos"), "Talos");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_item_order() {
        let key = ProductKey::new("talos", "v1.12.0", "amd64", "default");
        let record = MetadataRecord {
            creation_date: Some(0),
            meta_hash: "aaa".into(),
            meta_size: 1,
            disk_hash: "bbb".into(),
            disk_size: 2,
            combined_hash: "ccc".into(),
            source_url: None,
            schematic: None,
            repo: None,
            prefix: None,
        };
        let version = version_items(&key, "19700101_00:00", &record);
        let names: Vec<&str> = version.items.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["incus.tar.xz", "disk.qcow2", "lxd.tar.xz"]);

        let compat = &version.items["lxd.tar.xz"];
        assert_eq!(compat.ftype, "lxd.tar.xz");
        assert_eq!(compat.sha256, "aaa");
        assert_eq!(compat.combined_disk_kvm_img_sha256.as_deref(), Some("ccc"));
        assert_eq!(
            compat.path,
            "images/talos/v1.12.0/amd64/default/19700101_00:00/lxd.tar.xz"
        );
        assert_eq!(version.items["disk.qcow2"].combined_disk_kvm_img_sha256, None);
    }

    #[test]
    fn test_builds_accumulate_under_one_product() {
        let key = ProductKey::new("talos", "v1.12.0", "amd64", "default");
        let record = |ts: i64, hash: &str| MetadataRecord {
            creation_date: Some(ts),
            meta_hash: hash.into(),
            meta_size: 1,
            disk_hash: hash.into(),
            disk_size: 2,
            combined_hash: hash.into(),
            source_url: None,
            schematic: None,
            repo: None,
            prefix: None,
        };

        let mut document = ImagesDocument::default();
        add_product(&mut document, &key, &record(1766707200, "old"));
        add_product(&mut document, &key, &record(1766716800, "new"));

        assert_eq!(document.products.len(), 1);
        let versions: Vec<&str> = document.products[0]
            .versions
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(versions, vec!["20251226_00:00", "20251226_02:40"]);
        assert_eq!(
            document.products[0].versions["20251226_02:40"].items["disk.qcow2"].sha256,
            "new"
        );
    }
}
