//! ==============================================================================
//! store.rs - in-memory reading table
//! ==============================================================================
//!
//! purpose:
//!     the single accumulated table of readings, shared between:
//!     - the ingestion path (writes merged batches)
//!     - the web server (reads date-window slices)
//!
//! invariants (hold after every append):
//!     - rows are unique under full-row equality
//!     - rows are sorted ascending by timestamp, null timestamps last
//!
//! we use a tokio rwlock so an append is never observed half-merged:
//! many readers OR one writer.
//!
//! ==============================================================================

use std::collections::HashSet;

use chrono::{DateTime, Local, NaiveDate};
use tokio::sync::RwLock;

use crate::domain::{Reading, ReadingKey};
use crate::query::{self, NamedRange};

#[derive(Default)]
struct Table {
    rows: Vec<Reading>,
    // dedup keys of every row in `rows`; grows with it
    keys: HashSet<ReadingKey>,
    last_update: Option<DateTime<Local>>,
}

/// process-lifetime store; construct one per server (or per test)
#[derive(Default)]
pub struct DataStore {
    inner: RwLock<Table>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// merge a batch: union, drop exact duplicates, stable re-sort
    ///
    /// returns how many rows were actually new. existing rows come first in
    /// the merge so their relative order among equal timestamps is preserved,
    /// which makes re-appending a batch a no-op.
    pub async fn append(&self, batch: Vec<Reading>) -> usize {
        if batch.is_empty() {
            return 0;
        }

        let mut guard = self.inner.write().await;
        let table = &mut *guard;

        let fresh: Vec<Reading> = batch
            .into_iter()
            .filter(|r| table.keys.insert(r.dedup_key()))
            .collect();
        if fresh.is_empty() {
            return 0;
        }

        let added = fresh.len();
        table.rows.extend(fresh);
        table.rows.sort_by_key(Reading::sort_key);
        table.last_update = Some(Local::now());

        added
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// local time of the last append that added rows
    pub async fn last_update(&self) -> Option<DateTime<Local>> {
        self.inner.read().await.last_update
    }

    /// full copy of the table, in store order
    pub async fn snapshot(&self) -> Vec<Reading> {
        self.inner.read().await.rows.clone()
    }

    pub async fn today(&self) -> Vec<Reading> {
        self.today_at(Local::now().date_naive()).await
    }

    pub async fn today_at(&self, today: NaiveDate) -> Vec<Reading> {
        query::today(&self.inner.read().await.rows, today)
    }

    pub async fn range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Reading> {
        query::range(&self.inner.read().await.rows, start, end)
    }

    pub async fn by_date(&self, date: NaiveDate) -> Vec<Reading> {
        query::by_date(&self.inner.read().await.rows, date)
    }

    pub async fn named_range(&self, kind: NamedRange, today: NaiveDate) -> Vec<Reading> {
        query::named_range(&self.inner.read().await.rows, kind, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reading(day: u32, hour: u32, ph: f64) -> Reading {
        Reading {
            timestamp: Some(NaiveDate::from_ymd_opt(2024, 1, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()),
            ph: Some(ph),
            tds: Some(300.0),
            depth: None,
            flow_ind: None,
        }
    }

    fn untimed(ph: f64) -> Reading {
        Reading { timestamp: None, ph: Some(ph), tds: None, depth: None, flow_ind: None }
    }

    fn is_sorted(rows: &[Reading]) -> bool {
        rows.windows(2).all(|w| w[0].sort_key() <= w[1].sort_key())
    }

    #[tokio::test]
    async fn append_is_idempotent() {
        let store = DataStore::new();
        let batch = vec![reading(2, 0, 7.0), reading(1, 0, 7.1), untimed(6.0), reading(1, 0, 7.2)];

        assert_eq!(store.append(batch.clone()).await, 4);
        let once = store.snapshot().await;

        assert_eq!(store.append(batch).await, 0);
        assert_eq!(store.snapshot().await, once);
    }

    #[tokio::test]
    async fn duplicates_within_a_batch_collapse() {
        let store = DataStore::new();
        let added = store.append(vec![reading(1, 0, 7.0), reading(1, 0, 7.0), untimed(1.0), untimed(1.0)]).await;
        assert_eq!(added, 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn stays_sorted_across_appends() {
        let store = DataStore::new();
        store.append(vec![reading(5, 0, 1.0), untimed(9.0)]).await;
        store.append(vec![reading(3, 0, 2.0), reading(7, 0, 3.0)]).await;
        store.append(vec![untimed(8.0), reading(1, 12, 4.0)]).await;

        let rows = store.snapshot().await;
        assert_eq!(rows.len(), 6);
        assert!(is_sorted(&rows));
        assert!(rows[4].timestamp.is_none() && rows[5].timestamp.is_none());
    }

    #[tokio::test]
    async fn dedup_index_tracks_rows_across_appends() {
        let store = DataStore::new();
        store.append(vec![reading(1, 0, 7.0), untimed(1.0)]).await;
        store.append(vec![reading(2, 0, 7.5)]).await;
        assert_eq!(store.append(vec![reading(1, 0, 7.0), reading(2, 0, 7.5), untimed(1.0)]).await, 0);
        assert_eq!(store.append(vec![reading(1, 0, 7.0), reading(3, 0, 8.0)]).await, 1);

        let table = store.inner.read().await;
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.keys.len(), table.rows.len());
        assert!(table.rows.iter().all(|r| table.keys.contains(&r.dedup_key())));
    }

    #[tokio::test]
    async fn ties_keep_existing_order() {
        let store = DataStore::new();
        store.append(vec![reading(1, 0, 2.0), reading(1, 0, 1.0)]).await;
        store.append(vec![reading(1, 0, 0.5), reading(1, 0, 2.0)]).await;

        let phs: Vec<_> = store.snapshot().await.iter().map(|r| r.ph).collect();
        assert_eq!(phs, vec![Some(2.0), Some(1.0), Some(0.5)]);
    }

    #[tokio::test]
    async fn empty_batch_leaves_store_untouched() {
        let store = DataStore::new();
        store.append(vec![reading(1, 0, 7.0)]).await;
        let stamp = store.last_update().await;
        let before = store.snapshot().await;

        assert_eq!(store.append(Vec::new()).await, 0);
        assert_eq!(store.snapshot().await, before);
        assert_eq!(store.last_update().await, stamp);
    }

    #[tokio::test]
    async fn queries_on_empty_store_are_empty() {
        let store = DataStore::new();
        assert!(store.is_empty().await);
        assert!(store.last_update().await.is_none());
        assert!(store.today().await.is_empty());
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(store.by_date(d).await.is_empty());
        assert!(store.named_range(NamedRange::Last30Days, d).await.is_empty());
    }

    #[tokio::test]
    async fn today_sees_rows_stamped_now() {
        let store = DataStore::new();
        let now = Local::now().naive_local();
        let row = Reading { timestamp: Some(now), ph: Some(7.0), tds: None, depth: None, flow_ind: None };
        store.append(vec![row.clone(), reading(1, 0, 1.0)]).await;

        let hits = store.today_at(now.date()).await;
        assert_eq!(hits, vec![row]);
    }
}
