use chrono::{DateTime, Duration, Utc};
use seatline_core::show::dedup_seats;
use seatline_core::{
    Availability, Clock, ReservationError, ReservationResult, SeatNumber, Show, ShowRepository,
    ShowStats,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_hold_minutes: i64,
    pub max_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_hold_minutes: seatline_core::show::DEFAULT_HOLD_MINUTES,
            max_conflict_retries: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldConfirmation {
    pub show_id: Uuid,
    pub held_seats: Vec<SeatNumber>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub show_id: Uuid,
    pub booked_seats: Vec<SeatNumber>,
    pub booking_id: String,
}

/// Outcome of one evict -> validate -> mutate -> persist pass.
struct Transition<T> {
    show: Show,
    value: T,
    evicted: Vec<SeatNumber>,
    now: DateTime<Utc>,
}

/// Hold/book/availability state machine over a single show aggregate.
///
/// Every operation runs through [`ReservationEngine::transact`]: load the
/// show, drop expired holds, apply the operation, and commit with a
/// version-guarded save. A rejected save re-runs the whole sequence against
/// a fresh read, so a validation result is never committed against state it
/// was not computed from. Different shows never contend with each other.
pub struct ReservationEngine {
    repo: Arc<dyn ShowRepository>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl ReservationEngine {
    pub fn new(repo: Arc<dyn ShowRepository>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self { repo, clock, config }
    }

    pub fn repository(&self) -> &Arc<dyn ShowRepository> {
        &self.repo
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn create_show(&self, name: &str, total_seats: i32) -> ReservationResult<Show> {
        Ok(self.repo.create(name, total_seats).await?)
    }

    pub async fn list_shows(&self) -> ReservationResult<Vec<Show>> {
        Ok(self.repo.list_all().await?)
    }

    /// Counts and seat lists after pruning expired holds. The pruning is
    /// committed like any other write when it changed something.
    pub async fn check_availability(&self, show_id: Uuid) -> ReservationResult<Availability> {
        let t = self.transact(show_id, None, |_, _| Ok(())).await?;
        Ok(Availability::of(&t.show, t.now))
    }

    pub async fn stats(&self, show_id: Uuid) -> ReservationResult<ShowStats> {
        let t = self.transact(show_id, None, |_, _| Ok(())).await?;
        Ok(ShowStats::of(&t.show, t.now))
    }

    pub async fn hold(
        &self,
        show_id: Uuid,
        seat_numbers: &[SeatNumber],
        duration_minutes: Option<i64>,
    ) -> ReservationResult<HoldConfirmation> {
        let seats = dedup_seats(seat_numbers);
        if seats.is_empty() {
            return Err(ReservationError::InvalidRequest(
                "seatNumbers array is required".to_string(),
            ));
        }

        let minutes = duration_minutes.unwrap_or(self.config.default_hold_minutes);
        let duration = hold_duration(minutes)?;

        let t = self
            .transact(show_id, None, |show, now| {
                let expires_at = now.checked_add_signed(duration).ok_or_else(|| {
                    ReservationError::InvalidRequest("holdDurationMinutes is too large".to_string())
                })?;
                show.hold_seats(&seats, expires_at, now)?;
                Ok(expires_at)
            })
            .await?;

        debug!(%show_id, seats = ?seats, expires_at = %t.value, "Seats held");

        Ok(HoldConfirmation {
            show_id,
            held_seats: seats,
            expires_at: t.value,
        })
    }

    pub async fn book(
        &self,
        show_id: Uuid,
        seat_numbers: &[SeatNumber],
    ) -> ReservationResult<BookingConfirmation> {
        let seats = dedup_seats(seat_numbers);
        if seats.is_empty() {
            return Err(ReservationError::InvalidRequest(
                "seatNumbers array is required".to_string(),
            ));
        }

        let t = self
            .transact(show_id, None, |show, now| show.book_seats(&seats, now))
            .await?;

        let booking_id = booking_id(t.now);
        debug!(%show_id, seats = ?seats, %booking_id, "Seats booked");

        Ok(BookingConfirmation {
            show_id,
            booked_seats: seats,
            booking_id,
        })
    }

    /// Prunes expired holds from one show. Returns the number released.
    pub async fn evict_expired(&self, show_id: Uuid) -> ReservationResult<usize> {
        let t = self.transact(show_id, None, |_, _| Ok(())).await?;
        Ok(t.evicted.len())
    }

    /// Like [`Self::evict_expired`], but tries the given snapshot first and
    /// only re-reads after a conflict.
    pub(crate) async fn evict_from_snapshot(&self, snapshot: Show) -> ReservationResult<usize> {
        let t = self.transact(snapshot.id, Some(snapshot), |_, _| Ok(())).await?;
        Ok(t.evicted.len())
    }

    /// Runs `op` inside the shared evict/validate/mutate/persist loop.
    ///
    /// `op` may be called more than once and must derive everything from the
    /// show and `now` it is handed. Nothing is written when `op` fails or
    /// when the pass leaves the show unchanged.
    async fn transact<T, F>(
        &self,
        show_id: Uuid,
        snapshot: Option<Show>,
        mut op: F,
    ) -> ReservationResult<Transition<T>>
    where
        F: FnMut(&mut Show, DateTime<Utc>) -> ReservationResult<T>,
    {
        let mut seed = snapshot;
        let mut conflicts = 0u32;

        loop {
            let current = match seed.take() {
                Some(show) => show,
                None => self.repo.get(show_id).await?,
            };
            let now = self.clock.now();

            let mut next = current.clone();
            let evicted = next.evict_expired(now);
            let value = op(&mut next, now)?;

            if next == current {
                return Ok(Transition { show: current, value, evicted, now });
            }

            match self.repo.save(&next, current.version).await {
                Ok(committed) => {
                    if !evicted.is_empty() {
                        debug!(%show_id, evicted = ?evicted, "Evicted expired holds");
                    }
                    return Ok(Transition { show: committed, value, evicted, now });
                }
                Err(err) if err.is_conflict() => {
                    conflicts += 1;
                    if conflicts > self.config.max_conflict_retries {
                        warn!(%show_id, conflicts, "Giving up after repeated write conflicts");
                        return Err(ReservationError::StorageFailure(err));
                    }
                    debug!(%show_id, attempt = conflicts, "Write conflict, re-evaluating");
                    tokio::task::yield_now().await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn hold_duration(minutes: i64) -> ReservationResult<Duration> {
    if minutes < 0 {
        return Err(ReservationError::InvalidRequest(
            "holdDurationMinutes must not be negative".to_string(),
        ));
    }
    Duration::try_minutes(minutes).ok_or_else(|| {
        ReservationError::InvalidRequest("holdDurationMinutes is too large".to_string())
    })
}

fn booking_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("booking_{}_{}", now.timestamp_millis(), &suffix[..9])
}
