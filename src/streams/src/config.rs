use crate::error::{Result, StreamsError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default GitHub organization hosting the metadata tarball releases
pub const DEFAULT_ORGANIZATION: &str = "siderolabs";

/// Release asset URL for the metadata tarball
pub const DEFAULT_METADATA_URL_TEMPLATE: &str =
    "https://github.com/{org}/{repo}/releases/download/{version}/{prefix}-{arch}-incus.tar.xz";

/// Image-factory URL for the disk image
pub const DEFAULT_DISK_URL_TEMPLATE: &str =
    "https://factory.talos.dev/image/{schematic}/{version}/nocloud-{arch}.qcow2";

/// Schematic id of a vanilla image (no extensions, no extra kernel args)
pub const DEFAULT_SCHEMATIC: &str =
    "376567988ad370138ad8b2698212367b8edcb69b5fd68c80be1f2ec7d603b4ba";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally visible base URL (e.g. `https://images.example.com`).
    /// When unset, canonical URLs are derived from the request's Host header.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_organization")]
    pub organization: String,
    /// Placeholders: `{org}`, `{repo}`, `{prefix}`, `{arch}`, `{version}`
    #[serde(default = "default_metadata_url_template")]
    pub metadata_url_template: String,
    /// Placeholders: `{schematic}`, `{version}`, `{arch}`
    #[serde(default = "default_disk_url_template")]
    pub disk_url_template: String,
    #[serde(default = "default_schematic")]
    pub default_schematic: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
}

fn default_organization() -> String {
    DEFAULT_ORGANIZATION.to_string()
}

fn default_metadata_url_template() -> String {
    DEFAULT_METADATA_URL_TEMPLATE.to_string()
}

fn default_disk_url_template() -> String {
    DEFAULT_DISK_URL_TEMPLATE.to_string()
}

fn default_schematic() -> String {
    DEFAULT_SCHEMATIC.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_pool_idle_timeout_secs() -> u64 {
    90
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            metadata_url_template: default_metadata_url_template(),
            disk_url_template: default_disk_url_template(),
            default_schematic: default_schematic(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
        }
    }
}

/// Where registry values are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// JSON snapshot loaded at startup
    File { path: PathBuf },
    /// Read-only HTTP key-value endpoint
    Http {
        base_url: String,
        #[serde(default)]
        token: Option<String>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: PathBuf::from("registry.json"),
        }
    }
}

impl Config {
    /// Load from a TOML file; missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StreamsError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(raw).map_err(|e| StreamsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upstream.organization.trim().is_empty() {
            return Err(StreamsError::Config(
                "upstream.organization must not be empty".to_string(),
            ));
        }
        require_placeholders(
            "upstream.metadata_url_template",
            &self.upstream.metadata_url_template,
            &["{org}", "{repo}", "{arch}", "{version}"],
        )?;
        require_placeholders(
            "upstream.disk_url_template",
            &self.upstream.disk_url_template,
            &["{schematic}", "{version}"],
        )?;
        if self.upstream.default_schematic.is_empty() {
            return Err(StreamsError::Config(
                "upstream.default_schematic must not be empty".to_string(),
            ));
        }
        if let StoreConfig::Http { base_url, .. } = &self.store {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(StreamsError::Config(format!(
                    "store.base_url must be an http(s) URL, got '{}'",
                    base_url
                )));
            }
        }
        Ok(())
    }
}

fn require_placeholders(field: &str, template: &str, placeholders: &[&str]) -> Result<()> {
    for placeholder in placeholders {
        if !template.contains(placeholder) {
            return Err(StreamsError::Config(format!(
                "{} is missing placeholder {}",
                field, placeholder
            )));
        }
    }
    Ok(())
}
