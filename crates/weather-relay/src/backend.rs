//! HTTP delivery of message bodies to the backend.

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Destination for forwarded message bodies.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Deliver one body. `Ok` means the backend accepted it.
    async fn post(&self, body: &[u8]) -> RelayResult<()>;
}

#[async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    async fn post(&self, body: &[u8]) -> RelayResult<()> {
        (**self).post(body).await
    }
}

/// Backend reached over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    url: Url,
}

impl HttpBackend {
    /// Create a backend posting to `url` with the given request timeout.
    pub fn new(url: &str, timeout: Duration) -> RelayResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| RelayError::Config(format!("invalid backend URL '{url}': {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, url })
    }

    /// Create a backend from the relay configuration.
    pub fn from_config(config: &RelayConfig) -> RelayResult<Self> {
        Self::new(&config.backend_url, config.backend_timeout)
    }

    /// Target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// POST `body` unmodified as `application/json`.
    ///
    /// Succeeds only on 200 OK or 201 Created. Any other status is a
    /// [`RelayError::Backend`]; a request that cannot complete is a
    /// [`RelayError::Transport`].
    pub async fn post_to_backend(&self, body: &[u8]) -> RelayResult<()> {
        debug!(url = %self.url, payload_len = body.len(), "Posting message to backend");

        let response = self
            .client
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            status => Err(RelayError::Backend {
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn post(&self, body: &[u8]) -> RelayResult<()> {
        self.post_to_backend(body).await
    }
}
