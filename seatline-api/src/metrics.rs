use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use seatline_core::ReservationError;

/// Prometheus counters for the reservation surface.
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    seats_held: IntCounter,
    seats_booked: IntCounter,
    holds_evicted: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("seatline_requests_total", "Reservation requests by operation and outcome"),
            &["operation", "outcome"],
        )?;
        let seats_held = IntCounter::new("seatline_seats_held_total", "Seats placed on hold")?;
        let seats_booked = IntCounter::new("seatline_seats_booked_total", "Seats booked")?;
        let holds_evicted = IntCounter::new(
            "seatline_reaper_holds_evicted_total",
            "Expired holds released by the background reaper",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(seats_held.clone()))?;
        registry.register(Box::new(seats_booked.clone()))?;
        registry.register(Box::new(holds_evicted.clone()))?;

        Ok(Self { registry, requests, seats_held, seats_booked, holds_evicted })
    }

    pub fn observe<T>(&self, operation: &str, result: &Result<T, ReservationError>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(ReservationError::InvalidRequest(_)) => "invalid",
            Err(ReservationError::ShowNotFound(_)) => "not_found",
            Err(ReservationError::SeatUnavailable { .. }) | Err(ReservationError::SeatNotHeld { .. }) => "conflict",
            Err(ReservationError::StorageFailure(_)) => "error",
        };
        self.requests.with_label_values(&[operation, outcome]).inc();
    }

    pub fn record_held(&self, seats: usize) {
        self.seats_held.inc_by(seats as u64);
    }

    pub fn record_booked(&self, seats: usize) {
        self.seats_booked.inc_by(seats as u64);
    }

    pub fn record_evicted(&self, holds: usize) {
        self.holds_evicted.inc_by(holds as u64);
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
