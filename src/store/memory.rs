use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::StorageError;
use crate::metrics::{Reading, StoredSample};

use super::{newest_first, SampleStore};

#[derive(Default)]
struct MemoryState {
    samples: Vec<StoredSample>,
    next_id: i64,
}

/// Non-durable store backed by a `Vec`; ids start at 1.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Everything stored so far, in append order.
    pub fn snapshot(&self) -> Vec<StoredSample> {
        self.lock().samples.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SampleStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, reading: Reading) -> Result<StoredSample, StorageError> {
        let mut state = self.lock();
        state.next_id += 1;
        let sample = StoredSample::from_reading(state.next_id, reading);
        state.samples.push(sample.clone());
        Ok(sample)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredSample>, StorageError> {
        let mut samples = self.lock().samples.clone();
        samples.sort_by(newest_first);
        samples.truncate(limit);
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn reading_at(secs: i64) -> Reading {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs);
        Reading::new(ts, 10.0, 20.0, 30.0).unwrap()
    }

    #[tokio::test]
    async fn recent_orders_by_timestamp_then_id() {
        let store = MemoryStore::new();
        store.append(reading_at(5)).await.unwrap();
        store.append(reading_at(1)).await.unwrap();
        store.append(reading_at(5)).await.unwrap();

        let ids: Vec<i64> = store
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);

        assert_eq!(store.recent(1).await.unwrap()[0].id, 3);
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let store = MemoryStore::new();
        assert!(store.recent(10).await.unwrap().is_empty());
        assert!(store.is_empty());
    }
}
