//! ==============================================================================
//! ingest.rs - fetch -> normalize -> append
//! ==============================================================================
//!
//! purpose:
//!     the one ingestion path. used by:
//!     - GET /update_data (on demand)
//!     - the background poll loop (every `polling.interval_seconds`)
//!
//! the fetch runs outside the store lock; only the merge takes the write lock.
//!
//! ==============================================================================

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::fetcher::Fetcher;
use crate::normalize::normalize;
use crate::store::DataStore;

/// what one ingestion pass did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// rows produced by the normalizer
    pub received: usize,
    /// rows that were new to the store
    pub added: usize,
}

impl IngestOutcome {
    pub fn is_empty(&self) -> bool {
        self.received == 0
    }

    pub fn message(&self) -> &'static str {
        if self.is_empty() {
            "No new data to update"
        } else {
            "Data updated successfully"
        }
    }
}

pub async fn ingest(fetcher: &dyn Fetcher, store: &DataStore, url: &str) -> IngestOutcome {
    let payload = fetcher.fetch(url).await;
    let batch = normalize(payload);
    let received = batch.len();
    if received == 0 {
        info!("no new data to update");
        return IngestOutcome::default();
    }

    let added = store.append(batch).await;
    info!(received, added, "data updated");
    IngestOutcome { received, added }
}

/// poll the source forever on a fixed interval
pub async fn run_poll_loop(
    fetcher: Arc<dyn Fetcher>,
    store: Arc<DataStore>,
    url: String,
    interval_seconds: u64,
) {
    let period = Duration::from_secs(interval_seconds.max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(interval_seconds = period.as_secs(), "starting source polling");
    loop {
        ticker.tick().await;
        let outcome = ingest(fetcher.as_ref(), &store, &url).await;
        if outcome.is_empty() {
            warn!(url = %url, "poll returned no data");
        }
    }
}
