//! Simplestreams documents. Field declaration order is the emitted JSON order;
//! maps are `IndexMap` so products, versions and items keep first-seen order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const INDEX_FORMAT: &str = "index:1.0";
pub const PRODUCTS_FORMAT: &str = "products:1.0";
pub const IMAGES_DATATYPE: &str = "image-downloads";
pub const IMAGES_CONTENT_ID: &str = "images";
/// Stream-relative location of the images document, as listed in the index.
pub const IMAGES_PATH: &str = "streams/v1/images.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub format: String,
    pub index: IndexEntries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntries {
    pub images: IndexImages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexImages {
    pub datatype: String,
    pub path: String,
    pub format: String,
    pub products: Vec<String>,
}

impl IndexDocument {
    pub fn new(products: Vec<String>) -> Self {
        Self {
            format: INDEX_FORMAT.to_string(),
            index: IndexEntries {
                images: IndexImages {
                    datatype: IMAGES_DATATYPE.to_string(),
                    path: IMAGES_PATH.to_string(),
                    format: PRODUCTS_FORMAT.to_string(),
                    products,
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagesDocument {
    pub format: String,
    pub content_id: String,
    pub datatype: String,
    pub products: IndexMap<String, Product>,
}

impl Default for ImagesDocument {
    fn default() -> Self {
        Self {
            format: PRODUCTS_FORMAT.to_string(),
            content_id: IMAGES_CONTENT_ID.to_string(),
            datatype: IMAGES_DATATYPE.to_string(),
            products: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Comma-separated alias list
    pub aliases: String,
    pub arch: String,
    pub os: String,
    pub release: String,
    pub release_title: String,
    pub requirements: BTreeMap<String, String>,
    pub variant: String,
    pub versions: IndexMap<String, ProductVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductVersion {
    pub items: IndexMap<String, Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub ftype: String,
    pub sha256: String,
    pub size: u64,
    pub path: String,
    /// Fingerprint of metadata tarball + disk image, read by clients off the metadata item.
    #[serde(
        rename = "combined_disk-kvm-img_sha256",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub combined_disk_kvm_img_sha256: Option<String>,
}
