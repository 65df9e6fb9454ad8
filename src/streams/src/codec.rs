//! Conversions between registry keys, wire keys, download paths and
//! architecture names.
//!
//! Storage keys look like `product:talos:v1.12.0:amd64:default`; the wire form
//! drops the namespace segment. Download paths are
//! `images/<os>/<version>/<arch>/<variant>/<versionKey>/<filename>` relative to
//! the stream root, and must parse back to exactly the same coordinates.

use crate::error::{Result, StreamsError};
use chrono::{DateTime, Utc};
use std::fmt;

/// Namespace segment that marks a registry key as a product entry.
pub const PRODUCT_NAMESPACE: &str = "product";

/// Root segment of every download path.
pub const DOWNLOAD_ROOT: &str = "images";

/// Identity of one publishable image variant, without the storage namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub os: String,
    pub version: String,
    pub arch: String,
    pub variant: String,
}

impl ProductKey {
    pub fn new(
        os: impl Into<String>,
        version: impl Into<String>,
        arch: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            os: os.into(),
            version: version.into(),
            arch: arch.into(),
            variant: variant.into(),
        }
    }

    /// Parse a storage key. Returns `None` unless the key has exactly five
    /// colon-separated, non-empty segments led by [`PRODUCT_NAMESPACE`].
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let parts: Vec<&str> = key.split(':').collect();
        match parts.as_slice() {
            [ns, os, version, arch, variant]
                if *ns == PRODUCT_NAMESPACE
                    && [os, version, arch, variant].iter().all(|s| !s.is_empty()) =>
            {
                Some(Self::new(*os, *version, *arch, *variant))
            }
            _ => None,
        }
    }

    pub fn storage_key(&self) -> String {
        format!("{}:{}", PRODUCT_NAMESPACE, self.wire_key())
    }

    pub fn wire_key(&self) -> String {
        format!("{}:{}:{}:{}", self.os, self.version, self.arch, self.variant)
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.os, self.version, self.arch, self.variant)
    }
}

/// Strip the namespace from a storage key. `None` means "drop this entry".
pub fn registry_key_to_wire_key(key: &str) -> Option<String> {
    ProductKey::from_storage_key(key).map(|k| k.wire_key())
}

/// Known architectures. Unknown names are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
    Other(String),
}

impl Arch {
    pub fn parse(name: &str) -> Self {
        match name {
            "amd64" | "x86_64" | "x86-64" => Arch::Amd64,
            "arm64" | "aarch64" | "arm64-v8" => Arch::Arm64,
            other => Arch::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
            Arch::Other(name) => name,
        }
    }
}

pub fn normalize_arch(name: &str) -> String {
    Arch::parse(name).as_str().to_string()
}

/// `YYYYMMDD_HH:MM` in UTC. A missing (or unrepresentable) timestamp means now.
pub fn version_key(creation_epoch_secs: Option<i64>) -> String {
    let when = creation_epoch_secs
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);
    when.format("%Y%m%d_%H:%M").to_string()
}

/// Which of the two artifacts a filename refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Metadata,
    Disk,
}

/// Every filename the catalog publishes or the proxy accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFile {
    /// Canonical metadata tarball.
    IncusMetadata,
    /// Same tarball under the name older clients look for.
    LxdMetadata,
    /// Canonical disk image.
    DiskQcow2,
    /// Alternate disk spelling, accepted on download only.
    DiskKvmImg,
}

impl ArtifactFile {
    pub const ALL: [ArtifactFile; 4] = [
        ArtifactFile::IncusMetadata,
        ArtifactFile::LxdMetadata,
        ArtifactFile::DiskQcow2,
        ArtifactFile::DiskKvmImg,
    ];

    pub fn from_filename(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.filename() == name)
    }

    pub fn filename(self) -> &'static str {
        match self {
            ArtifactFile::IncusMetadata => "incus.tar.xz",
            ArtifactFile::LxdMetadata => "lxd.tar.xz",
            ArtifactFile::DiskQcow2 => "disk.qcow2",
            ArtifactFile::DiskKvmImg => "disk-kvm.img",
        }
    }

    /// Simplestreams `ftype` for the catalog item.
    pub fn ftype(self) -> &'static str {
        match self {
            ArtifactFile::IncusMetadata => "incus.tar.xz",
            ArtifactFile::LxdMetadata => "lxd.tar.xz",
            ArtifactFile::DiskQcow2 | ArtifactFile::DiskKvmImg => "disk-kvm.img",
        }
    }

    pub fn kind(self) -> ArtifactKind {
        match self {
            ArtifactFile::IncusMetadata | ArtifactFile::LxdMetadata => ArtifactKind::Metadata,
            ArtifactFile::DiskQcow2 | ArtifactFile::DiskKvmImg => ArtifactKind::Disk,
        }
    }
}

/// Stream-relative path of one artifact, as embedded in the catalog.
pub fn download_path(key: &ProductKey, version_key: &str, filename: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}/{}",
        DOWNLOAD_ROOT, key.os, key.version, key.arch, key.variant, version_key, filename
    )
}

/// Coordinates recovered from a download path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub key: ProductKey,
    pub version_key: String,
    pub filename: String,
}

const DOWNLOAD_GRAMMAR: &str =
    "expected /images/<os>/<version>/<arch>/<variant>/<versionKey>/<filename>";

/// Inverse of [`download_path`]. Accepts the path with or without a leading slash.
pub fn parse_download_path(path: &str) -> Result<DownloadRequest> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let segments: Vec<&str> = trimmed.split('/').collect();

    match segments.as_slice() {
        [root, os, version, arch, variant, vkey, filename]
            if *root == DOWNLOAD_ROOT
                && [os, version, arch, variant, vkey, filename]
                    .iter()
                    .all(|s| !s.is_empty()) =>
        {
            Ok(DownloadRequest {
                key: ProductKey::new(*os, *version, *arch, *variant),
                // Some clients percent-encode the colon in the version key
                version_key: vkey.replace("%3A", ":").replace("%3a", ":"),
                filename: (*filename).to_string(),
            })
        }
        _ => Err(StreamsError::BadRequest(format!(
            "invalid download path '{}': {}",
            path, DOWNLOAD_GRAMMAR
        ))),
    }
}
