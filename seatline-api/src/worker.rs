use std::sync::Arc;
use std::time::Duration;
use seatline_reservation::{ExpiryReaper, ReaperHandle, ReservationEngine};

use crate::metrics::Metrics;

/// Starts the background expiry reaper with its sweeps feeding `metrics`.
pub fn start_expiry_reaper(
    engine: Arc<ReservationEngine>,
    interval_seconds: u64,
    metrics: Arc<Metrics>,
) -> ReaperHandle {
    // tokio intervals must be non-zero
    let interval = Duration::from_secs(interval_seconds.max(1));

    ExpiryReaper::new(engine, interval)
        .with_sweep_hook(move |report| metrics.record_evicted(report.holds_evicted))
        .start()
}
