//! Keyed memoization of raw dataset loads.
//!
//! Fetching the dataset is far more expensive than cleaning and clustering
//! it, so repeated pipeline runs (e.g. every cluster-count change) reuse the
//! rows loaded for the same store id. Empty loads are not cached so a failed
//! retrieval can be retried.

use std::collections::BTreeMap;
use std::sync::Arc;

use patrol_map_incident_models::IncidentRecord;
use tokio::sync::Mutex;

use crate::{RecordStore, SourceError};

/// Shared, read-only rows for one dataset.
pub type CachedRecords = Arc<Vec<IncidentRecord>>;

/// Process-wide cache of loaded datasets keyed by [`RecordStore::id`].
#[derive(Default)]
pub struct LoadCache {
    entries: Mutex<BTreeMap<String, CachedRecords>>,
}

impl LoadCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached rows for `store`, loading them on a miss.
    ///
    /// Concurrent callers for any key wait on the same lock, so a dataset
    /// is fetched at most once while it stays cached.
    ///
    /// # Errors
    ///
    /// Returns the store's [`SourceError`] on a miss that fails to load.
    /// Nothing is cached in that case.
    pub async fn get_or_load(
        &self,
        store: &dyn RecordStore,
    ) -> Result<CachedRecords, SourceError> {
        let mut entries = self.entries.lock().await;

        if let Some(records) = entries.get(store.id()) {
            log::debug!("Load cache hit for {}", store.id());
            return Ok(Arc::clone(records));
        }

        log::debug!("Load cache miss for {}", store.id());
        let records = Arc::new(store.load().await?);

        if records.is_empty() {
            log::debug!("Not caching empty dataset for {}", store.id());
        } else {
            entries.insert(store.id().to_string(), Arc::clone(&records));
        }

        Ok(records)
    }

    /// Drops the cached rows for `key`. Returns `true` if an entry existed.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }

    /// Drops every cached dataset.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of cached datasets.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct CountingStore {
        id: String,
        rows: usize,
        loads: AtomicUsize,
    }

    impl CountingStore {
        fn new(id: &str, rows: usize) -> Self {
            Self {
                id: id.to_string(),
                rows,
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RecordStore for CountingStore {
        fn id(&self) -> &str {
            &self.id
        }

        async fn load(&self) -> Result<Vec<IncidentRecord>, SourceError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok((0..self.rows)
                .map(|_| IncidentRecord::new(Some(1.0), Some(2.0), "Theft"))
                .collect())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl RecordStore for FailingStore {
        fn id(&self) -> &str {
            "failing"
        }

        async fn load(&self) -> Result<Vec<IncidentRecord>, SourceError> {
            Err(SourceError::Io(std::io::Error::other("connection reset")))
        }
    }

    #[tokio::test]
    async fn second_load_is_served_from_cache() {
        let cache = LoadCache::new();
        let store = CountingStore::new("s3://bucket/a.csv", 3);

        let first = cache.get_or_load(&store).await.unwrap();
        let second = cache.get_or_load(&store).await.unwrap();

        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn different_keys_load_separately() {
        let cache = LoadCache::new();
        let a = CountingStore::new("a", 1);
        let b = CountingStore::new("b", 2);

        assert_eq!(cache.get_or_load(&a).await.unwrap().len(), 1);
        assert_eq!(cache.get_or_load(&b).await.unwrap().len(), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cache = LoadCache::new();
        let store = CountingStore::new("a", 1);

        cache.get_or_load(&store).await.unwrap();
        assert!(cache.invalidate("a").await);
        assert!(!cache.invalidate("a").await);
        cache.get_or_load(&store).await.unwrap();

        assert_eq!(store.loads.load(Ordering::SeqCst), 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn empty_loads_are_not_cached() {
        let cache = LoadCache::new();
        let store = CountingStore::new("empty", 0);

        assert!(cache.get_or_load(&store).await.unwrap().is_empty());
        assert!(cache.get_or_load(&store).await.unwrap().is_empty());

        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn load_errors_propagate_and_are_not_cached() {
        let cache = LoadCache::new();

        let err = cache.get_or_load(&FailingStore).await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
        assert!(cache.is_empty().await);
    }
}
