//! Serve a one-product catalog from an in-memory registry.
//!
//! Run with:
//! ```bash
//! cargo run --example basic_server
//! curl http://127.0.0.1:8080/streams/v1/images.json
//! ```

use std::sync::Arc;
use streams::{build_router, AppState, Config, MemoryStore, UpstreamClient};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let key = "product:talos:v1.12.0:amd64:default";
    let store = MemoryStore::from_pairs([
        ("products".to_string(), format!(r#"["{}"]"#, key)),
        (
            key.to_string(),
            r#"{"creation_date":1766716800,"meta_hash":"aaa","meta_size":1024,"disk_hash":"bbb","disk_size":207000000,"combined_hash":"ccc"}"#.to_string(),
        ),
    ]);

    let config = Config::default();
    let upstream = Arc::new(UpstreamClient::new(&config.upstream)?);
    let state = AppState::new(&config, Arc::new(store), upstream);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    tracing::info!("  Press Ctrl+C to stop");

    tokio::select! {
        result = axum::serve(listener, build_router(state)) => result?,
        _ = signal::ctrl_c() => tracing::info!("Shutting down..."),
    }
    Ok(())
}
