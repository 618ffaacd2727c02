//! Migration service client
//!
//! Sends the launch request and hands back the raw response body as a
//! stream of byte chunks. Framing is left to [`super::stream`].

use super::form::MigrationConfig;
use crate::config::ServiceConfig;
use crate::error::{MigratorError, Result};
use crate::utils::ellipsize;
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::Client;
use reqwest::header::ACCEPT;
use std::pin::Pin;
use std::time::Duration;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Raw response body, chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Something that can start a migration job and stream its output
#[async_trait]
pub trait MigrationClient: Send + Sync {
    /// Submit the settings. Resolves once the response head has arrived.
    async fn launch(&self, config: &MigrationConfig) -> Result<ByteStream>;

    /// Where launches go, for logs and status output
    fn endpoint(&self) -> &str;
}

/// Client for the HTTP migration service
#[derive(Clone)]
pub struct HttpMigrationClient {
    client: Client,
    url: String,
}

impl HttpMigrationClient {
    pub fn new(service: &ServiceConfig) -> Result<Self> {
        // No total timeout: a migration stream may stay open for a long time
        let client = Client::builder()
            .connect_timeout(service.connect_timeout())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| MigratorError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(service.launch_url(), client))
    }

    /// Create with custom HTTP client
    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl MigrationClient for HttpMigrationClient {
    async fn launch(&self, config: &MigrationConfig) -> Result<ByteStream> {
        tracing::info!(
            url = %self.url,
            site = %config.rocket_name,
            location = config.rocket_location,
            visual = config.visual,
            "launching migration"
        );

        let response = self
            .client
            .post(&self.url)
            .header(ACCEPT, "text/event-stream")
            .json(config)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.trim();
            tracing::error!(status = status.as_u16(), "migration service refused launch");
            return Err(MigratorError::Launch(if body.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                format!("HTTP {}: {}", status.as_u16(), ellipsize(body, 200))
            }));
        }

        tracing::debug!(status = status.as_u16(), "stream established");

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| MigratorError::Transport(e.to_string()))
        });
        Ok(Box::pin(stream))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
