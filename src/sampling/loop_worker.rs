use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    metrics::MetricSampler,
    recording::{Recorder, TickOutcome},
    store::SampleStore,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Ticks `recorder` until cancelled: once immediately, then every interval.
///
/// A tick runs to completion before the next one is scheduled. If a tick
/// overruns its period the next one starts a full period after it finished.
/// An interval change re-arms the pending wait relative to the last tick.
pub async fn sampling_loop<M, S>(recorder: Recorder<M, S>, cancel_token: CancellationToken)
where
    M: MetricSampler,
    S: SampleStore,
{
    let mut interval_rx = recorder.subscribe_interval();
    let mut period = interval_rx.borrow_and_update().as_duration();
    let mut last_tick = Instant::now();
    let mut deadline = last_tick;

    log_info!("sampling loop started ({}s interval)", period.as_secs());

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down");
                break;
            }
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    log_warn!("interval channel closed; sampling loop exiting");
                    break;
                }
                period = interval_rx.borrow_and_update().as_duration();
                deadline = last_tick + period;
            }
            _ = time::sleep_until(deadline) => {
                last_tick = deadline;
                match recorder.tick().await {
                    Ok(outcome) => log_tick(&outcome),
                    Err(err) => log_error!("tick failed: {err}"),
                }

                deadline = last_tick + period;
                let now = Instant::now();
                if deadline < now {
                    log_warn!("tick overran its {}s period", period.as_secs());
                    deadline = now + period;
                }
            }
        }
    }
}

fn log_tick(outcome: &TickOutcome) {
    if let Some(stored) = &outcome.stored {
        log_info!(
            "recorded sample {} ({})",
            stored.id,
            outcome.reading
        );
    }
}
