pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod proxy;
pub mod record;
pub mod server;
pub mod state;
pub mod store;

pub use catalog::{CatalogBuilder, ImagesDocument, IndexDocument};
pub use config::{Config, StoreConfig, UpstreamConfig};
pub use error::{Result, StreamsError};
pub use proxy::{DownloadProxy, UpstreamClient};
pub use record::MetadataRecord;
pub use server::build_router;
pub use state::{AppState, CatalogStats};
pub use store::{HttpKvStore, MemoryStore, RegistryStore};

/// Start the simplestreams server with the given configuration
pub async fn start_server(
    config: Config,
) -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>)> {
    server::start_server(config).await
}
