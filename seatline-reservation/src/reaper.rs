use seatline_core::{ReservationError, ReservationResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::engine::ReservationEngine;

pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub shows_scanned: usize,
    pub shows_updated: usize,
    pub holds_evicted: usize,
    pub failures: usize,
}

type SweepHook = Arc<dyn Fn(&SweepReport) + Send + Sync>;

/// Background sweep that releases expired holds across every show.
///
/// Uses the engine's conditional-save loop, so a sweep racing a hold or book
/// on the same show either commits first or re-reads and re-evaluates.
pub struct ExpiryReaper {
    engine: Arc<ReservationEngine>,
    interval: Duration,
    on_sweep: Option<SweepHook>,
}

impl ExpiryReaper {
    pub fn new(engine: Arc<ReservationEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            on_sweep: None,
        }
    }

    /// Called with the report of every completed sweep.
    pub fn with_sweep_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SweepReport) + Send + Sync + 'static,
    {
        self.on_sweep = Some(Arc::new(hook));
        self
    }

    /// One pass over all shows. A failure on one show is logged and counted;
    /// the rest of the sweep carries on.
    pub async fn sweep(&self) -> ReservationResult<SweepReport> {
        let shows = self.engine.list_shows().await?;
        let mut report = SweepReport {
            shows_scanned: shows.len(),
            ..SweepReport::default()
        };

        for show in shows {
            let show_id = show.id;
            match self.engine.evict_from_snapshot(show).await {
                Ok(0) => {}
                Ok(evicted) => {
                    report.shows_updated += 1;
                    report.holds_evicted += evicted;
                }
                Err(ReservationError::ShowNotFound(_)) => {
                    debug!(%show_id, "Show disappeared during sweep");
                }
                Err(e) => {
                    report.failures += 1;
                    error!(%show_id, "Failed to evict expired holds: {}", e);
                }
            }
        }

        if let Some(hook) = &self.on_sweep {
            hook(&report);
        }

        Ok(report)
    }

    /// Spawns the periodic task. The first sweep runs immediately.
    pub fn start(self) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Expiry reaper started, sweeping every {:?}", period);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                // Not raced against shutdown: a sweep that has begun finishes.
                match self.sweep().await {
                    Ok(report) if report.holds_evicted > 0 || report.failures > 0 => {
                        info!(
                            shows_scanned = report.shows_scanned,
                            shows_updated = report.shows_updated,
                            holds_evicted = report.holds_evicted,
                            failures = report.failures,
                            "Expired holds swept"
                        );
                    }
                    Ok(report) => {
                        debug!(shows_scanned = report.shows_scanned, "Nothing to sweep");
                    }
                    Err(e) => error!("Error cleaning up expired holds: {}", e),
                }
            }

            info!("Expiry reaper stopped");
        });

        ReaperHandle { shutdown: shutdown_tx, task }
    }
}

/// Owner of a running reaper. Dropping it also ends the loop, but without
/// waiting for an in-flight sweep.
pub struct ReaperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Prevents further sweeps and waits for one in flight to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Expiry reaper task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
