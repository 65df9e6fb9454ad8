use super::source::{resolve_source, ArtifactSource};
use super::upstream::UpstreamClient;
use crate::codec::{normalize_arch, parse_download_path, ArtifactFile, ProductKey};
use crate::config::UpstreamConfig;
use crate::error::{Result, StreamsError};
use crate::record::MetadataRecord;
use crate::store::RegistryStore;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::Response,
};
use std::sync::Arc;

/// Artifact sha256 as stored in the registry
pub const CONTENT_HASH_HEADER: &str = "x-checksum-sha256";

/// Headers that describe the upstream connection rather than the payload.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Everything known about a download before any upstream traffic.
#[derive(Debug, Clone)]
pub struct ResolvedDownload {
    pub key: ProductKey,
    pub version_key: String,
    pub file: ArtifactFile,
    pub source: ArtifactSource,
}

#[derive(Clone)]
pub struct DownloadProxy {
    store: Arc<dyn RegistryStore>,
    upstream: Arc<UpstreamClient>,
    config: Arc<UpstreamConfig>,
}

impl DownloadProxy {
    pub fn new(
        store: Arc<dyn RegistryStore>,
        upstream: Arc<UpstreamClient>,
        config: Arc<UpstreamConfig>,
    ) -> Self {
        Self {
            store,
            upstream,
            config,
        }
    }

    /// Parse the path, load the record and pick the origin. No upstream I/O.
    pub async fn resolve(&self, request_path: &str) -> Result<ResolvedDownload> {
        let request = parse_download_path(request_path)?;

        let mut key = request.key;
        key.arch = normalize_arch(&key.arch);

        let storage_key = key.storage_key();
        let raw = self.store.get(&storage_key).await?.ok_or_else(|| {
            StreamsError::NotFound(format!("no image published for {}", key))
        })?;

        let record = MetadataRecord::decode(&storage_key, &raw)?;

        let file = ArtifactFile::from_filename(&request.filename).ok_or_else(|| {
            StreamsError::BadRequest(format!(
                "unrecognized artifact filename '{}'",
                request.filename
            ))
        })?;

        let source = resolve_source(&self.config, &key, file, &record);
        tracing::debug!(
            product = %key,
            version_key = %request.version_key,
            file = file.filename(),
            upstream = %source.url,
            "Resolved download"
        );

        Ok(ResolvedDownload {
            key,
            version_key: request.version_key,
            file,
            source,
        })
    }

    /// Resolve, fetch and stream. `canonical_url` is this request's own URL.
    ///
    /// Non-success upstream statuses come back as [`StreamsError::Upstream`]
    /// carrying the same status; those responses carry no hash header.
    pub async fn handle_download(
        &self,
        request_path: &str,
        canonical_url: &str,
    ) -> Result<Response> {
        let resolved = self.resolve(request_path).await?;

        let upstream = self.upstream.fetch(&resolved.source.url).await?;
        let status = upstream.status();
        if !status.is_success() {
            tracing::warn!(
                product = %resolved.key,
                file = resolved.file.filename(),
                upstream = %resolved.source.url,
                status = %status,
                "Upstream returned error status"
            );
            return Err(StreamsError::Upstream {
                status,
                message: format!(
                    "upstream returned HTTP {} for {}",
                    status.as_u16(),
                    resolved.file.filename()
                ),
            });
        }

        let mut headers = forwarded_headers(upstream.headers());
        headers.insert(
            HeaderName::from_static(CONTENT_HASH_HEADER),
            HeaderValue::from_str(&resolved.source.sha256).map_err(|_| {
                StreamsError::DataCorruption(format!(
                    "{}: hash is not a valid header value",
                    resolved.key.storage_key()
                ))
            })?,
        );
        headers.insert(
            header::CONTENT_LOCATION,
            HeaderValue::from_str(canonical_url).map_err(|_| {
                StreamsError::BadRequest("request URL is not a valid header value".to_string())
            })?,
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );

        tracing::info!(
            product = %resolved.key,
            file = resolved.file.filename(),
            upstream = %resolved.source.url,
            content_length = ?upstream.content_length(),
            "Streaming artifact from upstream"
        );

        // The body is pulled chunk by chunk; if the client goes away the
        // stream is dropped and the upstream connection with it.
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn forwarded_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len() + 3);
    for (name, value) in upstream {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
