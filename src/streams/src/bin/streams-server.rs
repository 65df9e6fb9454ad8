use clap::Parser;
use std::path::PathBuf;
use streams::{start_server, Config};
use tracing_subscriber::EnvFilter;

/// Simplestreams catalog and download proxy
#[derive(Parser, Debug)]
#[command(name = "streams-server", version)]
struct Args {
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server.port
    #[arg(long)]
    port: Option<u16>,

    /// Override upstream.organization
    #[arg(long)]
    organization: Option<String>,

    /// Override the registry snapshot file (store kind "file")
    #[arg(long)]
    registry: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(organization) = args.organization {
        config.upstream.organization = organization;
    }
    if let Some(path) = args.registry {
        config.store = streams::StoreConfig::File { path };
    }

    tracing::info!(
        bind = %config.server.bind_address,
        port = config.server.port,
        organization = %config.upstream.organization,
        "Starting simplestreams server"
    );

    let (addr, _handle) = start_server(config).await?;
    tracing::info!("Serving on http://{}/streams/v1/index.json", addr);
    tracing::info!("Press Ctrl+C to stop the server.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    Ok(())
}
