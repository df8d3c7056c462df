//! Persistence port for recorded samples.
//!
//! [`crate::db::Database`] is the durable SQLite implementation;
//! [`MemoryStore`] keeps everything in process.

mod memory;

pub use memory::MemoryStore;

use std::future::Future;

use crate::error::StorageError;
use crate::metrics::{Reading, StoredSample};

pub trait SampleStore: Send + Sync + 'static {
    /// Creates the backing structure if it is absent. Idempotent.
    fn ensure_schema(&self) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Persists one reading as a single record and returns it with its new id.
    fn append(
        &self,
        reading: Reading,
    ) -> impl Future<Output = Result<StoredSample, StorageError>> + Send;

    /// At most `limit` samples, newest timestamp first, ties broken by id descending.
    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<StoredSample>, StorageError>> + Send;
}

/// Ordering used by every [`SampleStore::recent`] implementation.
pub(crate) fn newest_first(a: &StoredSample, b: &StoredSample) -> std::cmp::Ordering {
    b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id))
}
