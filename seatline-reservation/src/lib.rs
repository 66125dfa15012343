pub mod engine;
pub mod reaper;

pub use engine::{BookingConfirmation, EngineConfig, HoldConfirmation, ReservationEngine};
pub use reaper::{ExpiryReaper, ReaperHandle, SweepReport, DEFAULT_REAPER_INTERVAL};
