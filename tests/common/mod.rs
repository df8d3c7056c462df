#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use chrono::Utc;
use sysrec_lib::{
    Error, MemoryStore, MetricSampler, Reading, SampleObserver, SampleStore, SamplingError,
    StorageError, StoredSample,
};
use tokio::time::Instant;

/// Returns `cpu = n, ram = 2n, disk = 3n` for the n-th call (capped at 100).
#[derive(Clone, Default)]
pub struct CountingSampler {
    calls: Arc<AtomicUsize>,
    fail_next: Arc<AtomicBool>,
}

impl CountingSampler {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl MetricSampler for CountingSampler {
    fn sample(&mut self) -> Result<Reading, SamplingError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SamplingError::MemoryUnavailable);
        }
        let n = (self.calls.fetch_add(1, Ordering::SeqCst) + 1) as f64;
        Reading::new(Utc::now(), n.min(100.0), (2.0 * n).min(100.0), (3.0 * n).min(100.0))
    }
}

#[derive(Debug, Clone)]
pub struct Seen {
    pub at: Instant,
    pub reading: Reading,
    pub recording: bool,
    pub elapsed: Option<Duration>,
    /// Rows in the watched store when the notification arrived.
    pub stored_before: usize,
}

/// Remembers every notification.
#[derive(Default)]
pub struct EventLog {
    samples: Mutex<Vec<Seen>>,
    errors: Mutex<Vec<String>>,
    watched: Mutex<Option<Arc<MemoryStore>>>,
}

impl EventLog {
    pub fn watching(store: Arc<MemoryStore>) -> Self {
        let log = Self::default();
        *log.watched.lock().unwrap() = Some(store);
        log
    }

    pub fn samples(&self) -> Vec<Seen> {
        self.samples.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl SampleObserver for EventLog {
    fn on_sample(&self, reading: &Reading, recording: bool, elapsed: Option<Duration>) {
        let stored_before = self
            .watched
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, |store| store.len());
        self.samples.lock().unwrap().push(Seen {
            at: Instant::now(),
            reading: *reading,
            recording,
            elapsed,
            stored_before,
        });
    }

    fn on_error(&self, error: &Error) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

/// Fails the first `failures` appends, then behaves like a [`MemoryStore`].
pub struct FlakyStore {
    inner: MemoryStore,
    failures: AtomicUsize,
}

impl FlakyStore {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: AtomicUsize::new(failures),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl SampleStore for FlakyStore {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, reading: Reading) -> Result<StoredSample, StorageError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::WorkerGone);
        }
        self.inner.append(reading).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredSample>, StorageError> {
        self.inner.recent(limit).await
    }
}

/// A [`MemoryStore`] whose appends take `delay` to complete.
pub struct SlowStore {
    pub inner: Arc<MemoryStore>,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Arc::new(MemoryStore::new()),
            delay,
        }
    }
}

impl SampleStore for SlowStore {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, reading: Reading) -> Result<StoredSample, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.append(reading).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredSample>, StorageError> {
        self.inner.recent(limit).await
    }
}

/// Never answers within any sane timeout.
pub struct HungStore;

impl SampleStore for HungStore {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, _reading: Reading) -> Result<StoredSample, StorageError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(StorageError::WorkerGone)
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<StoredSample>, StorageError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// Panics on every notification.
pub struct PanickingObserver;

impl SampleObserver for PanickingObserver {
    fn on_sample(&self, _reading: &Reading, _recording: bool, _elapsed: Option<Duration>) {
        panic!("observer blew up");
    }

    fn on_error(&self, _error: &Error) {
        panic!("observer blew up");
    }
}
