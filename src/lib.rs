pub mod config;
pub mod console;
pub mod db;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod recording;
pub mod sampling;
pub mod settings;
pub mod store;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use tokio::io::{stdin, stdout, BufReader};

pub use config::{RecorderConfig, SampleInterval};
pub use db::Database;
pub use error::{ConfigError, Error, Result, SamplingError, StorageError};
pub use metrics::{MetricSampler, Reading, StoredSample, SystemSampler};
pub use observer::{ChannelObserver, RecorderEvent, SampleObserver};
pub use recording::{Recorder, RecordingSession, RecordingStatus, TickOutcome};
pub use sampling::SamplingService;
pub use store::{MemoryStore, SampleStore};

use console::{render_event, run_console};
use settings::SettingsStore;

const EVENT_BUFFER: usize = 64;

/// Runs the recorder against the local host with the operator console on stdin.
pub async fn run() -> anyhow::Result<()> {
    // Initialize logging (RUST_LOG overrides the Info default)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("sysrec starting up...");

    let config = RecorderConfig::from_env().context("invalid configuration")?;
    let settings = SettingsStore::new(config.settings_path())?;
    let interval = config
        .interval
        .or_else(|| settings.interval())
        .unwrap_or_default();

    let database = Database::open(config.db_path.clone())
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;
    // A write stuck on a foreign lock must fail before the recorder stops waiting.
    database
        .set_busy_timeout(config.store_timeout / 2)
        .await
        .context("failed to configure database busy timeout")?;
    let sampler = SystemSampler::new(config.disk_mount.clone())
        .context("failed to initialise system sampler")?;

    let (observer, mut events) = ChannelObserver::new(EVENT_BUFFER);
    let recorder = Recorder::new(sampler, Arc::new(database), Arc::new(observer), interval)
        .with_store_timeout(config.store_timeout);

    recorder
        .ensure_schema()
        .await
        .context("failed to prepare database schema")?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", render_event(&event));
        }
    });

    let mut service = SamplingService::new();
    service.start(recorder.clone())?;
    info!("Sampling every {}s; type 'help' for commands", interval.secs());

    let console_result = run_console(
        &recorder,
        Some(&settings),
        BufReader::new(stdin()),
        stdout(),
    )
    .await;

    if recorder.is_recording().await {
        if let Err(err) = recorder.stop().await {
            warn!("Failed to stop recording on exit: {err}");
        }
    }
    service.shutdown().await?;
    printer.abort();

    console_result
}
