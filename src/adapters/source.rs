//! HTTP data sources feeding the snapshot
//!
//! Every failure mode (network error, timeout, non-success status, malformed
//! body) is returned as an `Err` so the refresher can treat them uniformly.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::SourceConfig;
use crate::domain::{Payload, Slot};
use crate::error::{HashBotError, Result};

/// One upstream feeding one snapshot slot
#[async_trait]
pub trait DataSource: Send + Sync {
    fn slot(&self) -> Slot;

    /// Name used in logs
    fn name(&self) -> &str {
        self.slot().as_str()
    }

    async fn fetch(&self) -> Result<Payload>;
}

/// JSON over HTTP GET
#[derive(Clone)]
pub struct HttpSource {
    slot: Slot,
    url: String,
    client: Client,
}

impl HttpSource {
    /// Create a source with its own client
    pub fn new(slot: Slot, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(slot, url, build_client(timeout)?))
    }

    /// Create a source sharing an existing client
    pub fn with_client(slot: Slot, url: impl Into<String>, client: Client) -> Self {
        Self {
            slot,
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn slot(&self) -> Slot {
        self.slot
    }

    async fn fetch(&self) -> Result<Payload> {
        let resp = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HashBotError::UpstreamStatus {
                source_name: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = resp.json().await?;
        debug!("{} responded from {}", self.name(), self.url);

        self.slot
            .parse_payload(body)
            .map_err(|reason| HashBotError::InvalidPayload {
                source_name: self.name().to_string(),
                reason,
            })
    }
}

/// Build the shared HTTP client; `timeout` bounds each whole request
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("hashbot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| HashBotError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Build one source per configured slot, all sharing a client
pub fn build_sources(
    sources: &[SourceConfig],
    timeout: Duration,
) -> Result<Vec<Arc<dyn DataSource>>> {
    let client = build_client(timeout)?;
    Ok(sources
        .iter()
        .map(|s| {
            Arc::new(HttpSource::with_client(s.slot, s.url.clone(), client.clone()))
                as Arc<dyn DataSource>
        })
        .collect())
}
