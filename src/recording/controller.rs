use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::{
    sync::{watch, Mutex},
    time::{self, Instant},
};

use crate::{
    config::SampleInterval,
    error::{Error, Result, SamplingError, StorageError},
    metrics::{MetricSampler, Reading, StoredSample},
    observer::SampleObserver,
    store::SampleStore,
};

use super::RecordingSession;

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// What a single successful tick produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub reading: Reading,
    pub recording: bool,
    pub elapsed: Option<Duration>,
    /// `None` while idle.
    pub stored: Option<StoredSample>,
}

/// Drives sampler -> observer -> store and owns the recording switch.
///
/// Cloning is cheap and every clone controls the same recorder, so `stop()`
/// and `set_interval()` can be called from any task while the sampling loop
/// runs elsewhere.
pub struct Recorder<M, S> {
    sampler: Arc<StdMutex<M>>,
    store: Arc<S>,
    observer: Arc<dyn SampleObserver>,
    session: Arc<Mutex<RecordingSession>>,
    interval_tx: Arc<watch::Sender<SampleInterval>>,
    store_timeout: Duration,
}

impl<M, S> Clone for Recorder<M, S> {
    fn clone(&self) -> Self {
        Self {
            sampler: Arc::clone(&self.sampler),
            store: Arc::clone(&self.store),
            observer: Arc::clone(&self.observer),
            session: Arc::clone(&self.session),
            interval_tx: Arc::clone(&self.interval_tx),
            store_timeout: self.store_timeout,
        }
    }
}

impl<M, S> Recorder<M, S>
where
    M: MetricSampler,
    S: SampleStore,
{
    pub fn new(
        sampler: M,
        store: Arc<S>,
        observer: Arc<dyn SampleObserver>,
        interval: SampleInterval,
    ) -> Self {
        let (interval_tx, _) = watch::channel(interval);
        Self {
            sampler: Arc::new(StdMutex::new(sampler)),
            store,
            observer,
            session: Arc::new(Mutex::new(RecordingSession::new())),
            interval_tx: Arc::new(interval_tx),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Upper bound for every store call; an elapsed bound is a [`StorageError::Timeout`].
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn session(&self) -> RecordingSession {
        self.session.lock().await.clone()
    }

    pub async fn is_recording(&self) -> bool {
        self.session.lock().await.is_active()
    }

    pub fn interval(&self) -> SampleInterval {
        *self.interval_tx.borrow()
    }

    /// Takes effect from the next scheduled tick.
    pub fn set_interval(&self, interval: SampleInterval) {
        let previous = self.interval_tx.send_replace(interval);
        if previous != interval {
            info!(
                "Sampling interval changed from {}s to {}s",
                previous.secs(),
                interval.secs()
            );
        }
    }

    pub(crate) fn subscribe_interval(&self) -> watch::Receiver<SampleInterval> {
        self.interval_tx.subscribe()
    }

    pub async fn start(&self) -> Result<DateTime<Utc>> {
        let started_at = Utc::now();
        let session_id = self
            .session
            .lock()
            .await
            .begin(started_at, Instant::now())?;

        info!("Recording started (session {session_id})");
        Ok(started_at)
    }

    /// Returns how long the recording ran. Once this returns, no further
    /// reading is persisted until the next `start()`.
    pub async fn stop(&self) -> Result<Duration> {
        let mut session = self.session.lock().await;
        let session_id = session.session_id();
        let elapsed = session.end(Instant::now())?;

        if let Some(id) = session_id {
            info!("Recording stopped (session {id}) after {}s", elapsed.as_secs());
        }
        Ok(elapsed)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        self.bounded(self.store.ensure_schema()).await?;
        Ok(())
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredSample>> {
        Ok(self.bounded(self.store.recent(limit)).await?)
    }

    /// One sample -> notify -> maybe persist cycle. Failures go to the
    /// observer and are also returned; the recording state is never changed.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let result = self.run_tick().await;
        if let Err(err) = &result {
            self.notify_error(err);
        }
        result
    }

    async fn run_tick(&self) -> Result<TickOutcome> {
        let reading = self.sample().await?;

        debug!(
            "Current stats -> CPU: {:.1}%, RAM: {:.1}%, Disk: {:.1}%",
            reading.cpu_pct, reading.ram_pct, reading.disk_pct
        );

        // Held through persistence so a concurrent stop() waits for this tick.
        let session = self.session.lock().await;
        let recording = session.is_active();
        let elapsed = session.elapsed(Instant::now());

        self.notify_sample(&reading, recording, elapsed);

        let stored = if recording {
            let stored = self.bounded(self.store.append(reading)).await?;
            debug!("Persisted sample {}", stored.id);
            Some(stored)
        } else {
            None
        };
        drop(session);

        Ok(TickOutcome {
            reading,
            recording,
            elapsed,
            stored,
        })
    }

    async fn sample(&self) -> Result<Reading> {
        let sampler = Arc::clone(&self.sampler);
        let reading = tokio::task::spawn_blocking(move || {
            sampler
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .sample()
        })
        .await
        .map_err(|err| SamplingError::Worker(err.to_string()))??;
        Ok(reading)
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = std::result::Result<T, StorageError>>,
    ) -> std::result::Result<T, StorageError> {
        match time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(self.store_timeout)),
        }
    }

    fn notify_sample(&self, reading: &Reading, recording: bool, elapsed: Option<Duration>) {
        let observer = &self.observer;
        if panic::catch_unwind(AssertUnwindSafe(|| {
            observer.on_sample(reading, recording, elapsed)
        }))
        .is_err()
        {
            warn!("observer panicked in on_sample");
        }
    }

    fn notify_error(&self, err: &Error) {
        let observer = &self.observer;
        if panic::catch_unwind(AssertUnwindSafe(|| observer.on_error(err))).is_err() {
            warn!("observer panicked in on_error");
        }
    }
}
