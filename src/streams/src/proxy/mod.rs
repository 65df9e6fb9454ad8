//! Download proxy: serves artifact bytes from their upstream origins.

pub mod download;
pub mod source;
pub mod upstream;

pub use download::{DownloadProxy, ResolvedDownload, CONTENT_HASH_HEADER};
pub use source::{ensure_version_prefix, resolve_source, ArtifactSource};
pub use upstream::UpstreamClient;
