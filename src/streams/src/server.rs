use crate::catalog::to_json;
use crate::codec::DOWNLOAD_ROOT;
use crate::config::Config;
use crate::error::{Result, StreamsError};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;

pub const INDEX_PATH: &str = "/streams/v1/index.json";
pub const IMAGES_PATH: &str = "/streams/v1/images.json";

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(INDEX_PATH, get(get_index))
        .route(IMAGES_PATH, get(get_images))
        // The wildcard needs a non-empty tail; the bare root still gets the grammar 400
        .route(&format!("/{}/", DOWNLOAD_ROOT), get(get_download))
        .route(&format!("/{}/*path", DOWNLOAD_ROOT), get(get_download))
        .route("/api/v1/catalog/stats", get(catalog_stats))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
}

/// Bind and serve in a background task. Returns the bound address, which
/// differs from the configured one when port 0 was requested.
pub async fn start_server(
    config: Config,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let state = AppState::from_config(&config).await?;

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        StreamsError::Config(format!("Failed to bind to {}: {}", addr, e))
    })?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        addr = %local_addr,
        index = INDEX_PATH,
        images = IMAGES_PATH,
        "Simplestreams server listening"
    );

    let handle = tokio::spawn(async move {
        let app = build_router(state);
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server error after startup: {}", e);
        } else {
            tracing::info!("HTTP server stopped");
        }
    });

    Ok((local_addr, handle))
}

/// GET /streams/v1/index.json
async fn get_index(State(state): State<AppState>) -> Result<Response> {
    let built = state.catalog.build_index().await?;
    state.stats.record_build(built.skipped);
    json_response(&built.document)
}

/// GET /streams/v1/images.json
async fn get_images(State(state): State<AppState>) -> Result<Response> {
    let built = state.catalog.build_images().await?;
    state.stats.record_build(built.skipped);
    json_response(&built.document)
}

/// GET /images/{os}/{version}/{arch}/{variant}/{versionKey}/{filename}
async fn get_download(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response> {
    let canonical = canonical_url(state.public_base_url.as_deref(), &headers, &uri);
    tracing::debug!(path = %uri.path(), canonical = %canonical, "Download request");
    state.proxy.handle_download(uri.path(), &canonical).await
}

/// GET /api/v1/catalog/stats
async fn catalog_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.stats.snapshot())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    tracing::debug!(path = %uri.path(), "No route");
    (StatusCode::NOT_FOUND, "not found")
}

fn json_response<T: Serialize>(document: &T) -> Result<Response> {
    let body = to_json(document)?;
    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    Ok(response)
}

/// URL the client used to reach this proxy. A configured public base URL wins
/// over `X-Forwarded-Proto` and `Host`.
pub fn canonical_url(public_base_url: Option<&str>, headers: &HeaderMap, uri: &Uri) -> String {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    if let Some(base) = public_base_url {
        return format!("{}{}", base.trim_end_matches('/'), path);
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");

    format!("{}://{}{}", scheme, host, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_url_from_host() {
        let uri: Uri = "/images/talos/v1.12.0/amd64/default/20251226_02:40/disk.qcow2"
            .parse()
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("images.example.com"));
        assert_eq!(
            canonical_url(None, &headers, &uri),
            "http://images.example.com/images/talos/v1.12.0/amd64/default/20251226_02:40/disk.qcow2"
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert!(canonical_url(None, &headers, &uri).starts_with("https://images.example.com/"));
    }

    #[test]
    fn test_canonical_url_public_base_wins() {
        let uri: Uri = "/images/a/b/c/d/e/incus.tar.xz".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));
        assert_eq!(
            canonical_url(Some("https://cdn.example.com/"), &headers, &uri),
            "https://cdn.example.com/images/a/b/c/d/e/incus.tar.xz"
        );
    }
}
