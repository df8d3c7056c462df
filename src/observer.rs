//! Observer port: where a UI, log sink or exporter plugs into the recorder.

use std::time::Duration;

use log::warn;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::metrics::Reading;

/// Notified on every tick. Implementations must contain their own failures;
/// neither method may block for long or panic.
pub trait SampleObserver: Send + Sync + 'static {
    fn on_sample(&self, reading: &Reading, recording: bool, elapsed: Option<Duration>);

    /// A tick failed to sample or persist. The loop keeps running.
    fn on_error(&self, error: &Error);
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecorderEvent {
    #[serde(rename_all = "camelCase")]
    Sample {
        reading: Reading,
        recording: bool,
        elapsed_secs: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

/// Forwards events into a bounded channel, dropping them when the consumer lags.
pub struct ChannelObserver {
    tx: mpsc::Sender<RecorderEvent>,
}

impl ChannelObserver {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RecorderEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    fn forward(&self, event: RecorderEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("observer channel full; dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

impl SampleObserver for ChannelObserver {
    fn on_sample(&self, reading: &Reading, recording: bool, elapsed: Option<Duration>) {
        self.forward(RecorderEvent::Sample {
            reading: *reading,
            recording,
            elapsed_secs: elapsed.map(|d| d.as_secs()),
        });
    }

    fn on_error(&self, error: &Error) {
        self.forward(RecorderEvent::Error {
            message: error.to_string(),
        });
    }
}

/// `HH:MM:SS`, hours keep growing past 99.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
