use crate::config::UpstreamConfig;
use crate::error::{Result, StreamsError};
use reqwest::{Client, Response};
use std::time::Duration;

/// HTTP client for artifact origins
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        // No overall request timeout: disk images stream for as long as they take
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("streams/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StreamsError::Http)?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Issue the GET. Status is left for the caller to judge.
    pub async fn fetch(&self, url: &str) -> Result<Response> {
        self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Upstream request failed");
            StreamsError::Upstream {
                status: reqwest::StatusCode::BAD_GATEWAY,
                message: "failed to reach upstream origin".to_string(),
            }
        })
    }
}
