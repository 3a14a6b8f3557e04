//! ==============================================================================
//! fetcher.rs - remote source client
//! ==============================================================================
//!
//! purpose:
//!     pulls raw sensor records from the upstream http source and classifies
//!     the decoded body into a RawPayload.
//!
//! failure model:
//!     the fetcher never returns an error. bad urls, refused connections,
//!     timeouts, non-2xx statuses and non-json bodies all log a warning and
//!     come back as RawPayload::Empty, so ingestion simply no-ops.
//!
//! relationships:
//!     - used by: ingest.rs (one fetch per ingestion)
//!     - produces: domain.rs (RawPayload)
//!
//! ==============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::RawPayload;

/// anything that can hand back decoded upstream records
///
/// the router holds this as `Arc<dyn Fetcher>` so tests can swap in a stub.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> RawPayload;
}

/// reqwest-backed fetcher with a per-request timeout
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn try_fetch(&self, url: &str) -> Result<Value, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> RawPayload {
        match self.try_fetch(url).await {
            Ok(value) => {
                debug!(url, "fetched payload from source");
                RawPayload::from_json(value)
            }
            Err(e) => {
                warn!(url, error = %e, "fetch from source failed");
                RawPayload::Empty
            }
        }
    }
}
