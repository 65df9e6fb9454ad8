use super::RegistryStore;
use crate::error::{Result, StreamsError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

/// Registry served over HTTP: `GET {base_url}/{key}` returns the raw value.
pub struct HttpKvStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpKvStore {
    pub fn new(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token,
        }
    }

    /// `key` is appended as one percent-encoded path segment.
    pub fn key_url(&self, key: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            StreamsError::Store(format!("invalid registry base URL '{}': {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                StreamsError::Store(format!(
                    "registry base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(key);
        Ok(url)
    }
}

#[async_trait]
impl RegistryStore for HttpKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let url = self.key_url(key)?;
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            StreamsError::Store(format!("registry read of '{}' failed: {}", key, e))
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text().await.map_err(|e| {
                    StreamsError::Store(format!("registry read of '{}' failed: {}", key, e))
                })?;
                Ok(Some(body))
            }
            status => {
                tracing::warn!(key = %key, status = %status, "Registry backend returned error status");
                Err(StreamsError::Store(format!(
                    "registry read of '{}' returned HTTP {}",
                    key, status
                )))
            }
        }
    }
}
