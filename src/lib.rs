//! sensor-hub: pulls water-quality readings (pH, TDS, depth, flow) from an
//! upstream http source into an in-memory table and serves date-window
//! queries over a small json api.
//!
//! ingestion: fetcher -> normalize -> store.append
//! queries:   store -> query (today / range / by date / named range)

pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod ingest;
pub mod normalize;
pub mod query;
pub mod server;
pub mod store;

pub use domain::{RawPayload, Reading};
pub use fetcher::{Fetcher, HttpFetcher};
pub use ingest::{ingest, IngestOutcome};
pub use query::NamedRange;
pub use server::{router, AppState};
pub use store::DataStore;
