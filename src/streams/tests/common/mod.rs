#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use streams::config::{Config, UpstreamConfig};
use streams::{build_router, AppState, MemoryStore, UpstreamClient};
use tokio_stream::wrappers::ReceiverStream;

pub const SCENARIO_KEY: &str = "product:talos:v1.12.0:amd64:default";
pub const SCENARIO_RECORD: &str = r#"{"creation_date":1766716800,"meta_hash":"aaa","meta_size":1024,"disk_hash":"bbb","disk_size":207000000,"combined_hash":"ccc"}"#;
pub const SCENARIO_VERSION_KEY: &str = "20251226_02:40";

pub const DISK_CHUNKS: [&str; 3] = ["disk-", "bytes-", "here"];
pub const METADATA_BODY: &str = "metadata-bytes";

/// Paths requested from the mock origin, in arrival order.
pub type Hits = Arc<Mutex<Vec<String>>>;

pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });
    addr
}

/// Mock artifact origin.
///
/// - any path containing `unavailable` answers 503
/// - `*.qcow2` streams [`DISK_CHUNKS`] without a Content-Length
/// - everything else answers [`METADATA_BODY`]
pub async fn spawn_origin() -> (SocketAddr, Hits) {
    let hits: Hits = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/*path", get(origin))
        .with_state(hits.clone());
    (spawn(app).await, hits)
}

async fn origin(State(hits): State<Hits>, uri: Uri) -> Response {
    hits.lock().unwrap().push(uri.path().to_string());

    if uri.path().contains("unavailable") {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }

    if uri.path().ends_with(".qcow2") {
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::io::Error>>(4);
        tokio::spawn(async move {
            for chunk in DISK_CHUNKS {
                let _ = tx.send(Ok(Bytes::from_static(chunk.as_bytes()))).await;
            }
        });
        return Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/octet-stream")
            .header("X-Upstream", "mock")
            .body(Body::from_stream(ReceiverStream::new(rx)))
            .unwrap();
    }

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/x-xz")
        .header("X-Upstream", "mock")
        .body(Body::from(METADATA_BODY))
        .unwrap()
}

/// Config whose both origin templates point at the mock origin.
pub fn config_for_origin(origin: SocketAddr) -> Config {
    let mut config = Config::default();
    config.upstream = UpstreamConfig {
        organization: "test-org".to_string(),
        metadata_url_template: format!(
            "http://{}/releases/{{org}}/{{repo}}/{{version}}/{{prefix}}-{{arch}}.tar.xz",
            origin
        ),
        disk_url_template: format!(
            "http://{}/factory/{{schematic}}/{{version}}/{{arch}}.qcow2",
            origin
        ),
        ..UpstreamConfig::default()
    };
    config
}

/// Serve the full router over `store`; returns the proxy address.
pub async fn spawn_proxy(config: &Config, store: MemoryStore) -> SocketAddr {
    let upstream = Arc::new(UpstreamClient::new(&config.upstream).unwrap());
    let state = AppState::new(config, Arc::new(store), upstream);
    spawn(build_router(state)).await
}

pub fn scenario_store() -> MemoryStore {
    MemoryStore::from_pairs([
        ("products".to_string(), format!(r#"["{}"]"#, SCENARIO_KEY)),
        (SCENARIO_KEY.to_string(), SCENARIO_RECORD.to_string()),
    ])
}
