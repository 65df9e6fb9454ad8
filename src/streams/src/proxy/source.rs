use crate::codec::{ArtifactFile, ArtifactKind, ProductKey};
use crate::config::UpstreamConfig;
use crate::record::MetadataRecord;

/// Upstream location of an artifact and the hash the registry holds for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub url: String,
    pub sha256: String,
}

/// Pick the origin for `file`.
///
/// Metadata tarballs always come from the code-release origin. Disk images use
/// the record's explicit `source_url` when present, otherwise the image-factory
/// template with the record's schematic (or the configured default).
pub fn resolve_source(
    upstream: &UpstreamConfig,
    key: &ProductKey,
    file: ArtifactFile,
    record: &MetadataRecord,
) -> ArtifactSource {
    match file.kind() {
        ArtifactKind::Metadata => ArtifactSource {
            url: metadata_url(upstream, key, record),
            sha256: record.meta_hash.clone(),
        },
        ArtifactKind::Disk => ArtifactSource {
            url: disk_url(upstream, key, record),
            sha256: record.disk_hash.clone(),
        },
    }
}

fn metadata_url(upstream: &UpstreamConfig, key: &ProductKey, record: &MetadataRecord) -> String {
    let repo = non_empty(record.repo.as_deref()).unwrap_or(key.os.as_str());
    let prefix = non_empty(record.prefix.as_deref()).unwrap_or(key.os.as_str());

    upstream
        .metadata_url_template
        .replace("{org}", &upstream.organization)
        .replace("{repo}", repo)
        .replace("{prefix}", prefix)
        .replace("{arch}", &key.arch)
        .replace("{version}", &key.version)
}

fn disk_url(upstream: &UpstreamConfig, key: &ProductKey, record: &MetadataRecord) -> String {
    if let Some(url) = non_empty(record.source_url.as_deref()) {
        return url.to_string();
    }

    let schematic =
        non_empty(record.schematic.as_deref()).unwrap_or(upstream.default_schematic.as_str());
    upstream
        .disk_url_template
        .replace("{schematic}", schematic)
        .replace("{version}", &ensure_version_prefix(&key.version))
        .replace("{arch}", &key.arch)
}

/// `1.12.0` -> `v1.12.0`; already-prefixed versions are left alone.
pub fn ensure_version_prefix(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
