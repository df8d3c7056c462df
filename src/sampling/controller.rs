use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{metrics::MetricSampler, recording::Recorder, store::SampleStore};

use super::loop_worker::sampling_loop;

/// Owns the background task that ticks a [`Recorder`].
#[derive(Default)]
pub struct SamplingService {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SamplingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start<M, S>(&mut self, recorder: Recorder<M, S>) -> Result<()>
    where
        M: MetricSampler,
        S: SampleStore,
    {
        if self.handle.is_some() {
            bail!("sampling loop already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(recorder, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancels the loop and waits for the in-flight tick to finish.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sampling loop task failed to join")?;
            info!("sampling loop stopped");
        }
        Ok(())
    }
}
