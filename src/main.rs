//! ==============================================================================
//! main.rs - sensor hub entry point
//! ==============================================================================
//!
//! responsibilities:
//!     - load configuration (hub.toml + API_URL / PORT)
//!     - set up tracing
//!     - own the data store for the life of the process
//!     - run the polling loop that pulls readings from the source
//!     - serve the json query api
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────┐
//!     │                  sensor hub (this file)               │
//!     │  ┌─────────────┐                ┌─────────────────┐  │
//!     │  │ poll loop   │                │ web server      │  │
//!     │  │ (ingest.rs) │                │ (server.rs)     │  │
//!     │  └──────┬──────┘                └────────┬────────┘  │
//!     │         │ append                 query   │           │
//!     │         └──────────┐      ┌──────────────┘           │
//!     │                 ┌──┴──────┴──┐                       │
//!     │                 │ data store │ <- store.rs           │
//!     │                 └────────────┘                       │
//!     └──────────────────────────────────────────────────────┘
//!                 ▲
//!                 │ http GET (fetcher.rs)
//!          ┌──────┴──────┐
//!          │ sensor feed │
//!          └─────────────┘
//!
//! ==============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sensor_hub::config::HubConfig;
use sensor_hub::{ingest, server, DataStore, Fetcher, HttpFetcher};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Sensor Hub - pH / TDS / Depth / Flow");
    println!("===========================================================");

    // step 1: load configuration
    let config = HubConfig::load_or_default();
    config.print_summary();

    // step 2: logging (RUST_LOG wins over the config file)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // step 3: shared state
    let store = Arc::new(DataStore::new());
    let fetcher: Arc<dyn Fetcher> =
        Arc::new(HttpFetcher::new(Duration::from_secs(config.source.timeout_seconds))?);

    // step 4: background polling
    if config.polling.enabled {
        tokio::spawn(ingest::run_poll_loop(
            fetcher.clone(),
            store.clone(),
            config.source.api_url.clone(),
            config.polling.interval_seconds,
        ));
    } else {
        tracing::info!("polling disabled, data arrives via /update_data only");
    }

    // step 5: serve until the process is stopped
    let state = server::AppState::new(store, fetcher, config.source.api_url.as_str());
    if let Err(e) = server::run_server(state, &config.bind_addr()).await {
        tracing::error!(error = %e, "web server error");
        return Err(e);
    }
    Ok(())
}
