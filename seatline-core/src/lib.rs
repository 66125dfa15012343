pub mod clock;
pub mod repository;
pub mod show;
pub mod views;

pub use clock::{Clock, ManualClock, SystemClock};
pub use repository::{RepositoryError, ShowRepository};
pub use show::{HeldSeat, SeatNumber, Show};
pub use views::{Availability, ShowStats};

use uuid::Uuid;

/// Errors surfaced by hold/book/availability operations.
///
/// Optimistic-write conflicts never appear here while retries remain; the
/// engine absorbs them and re-evaluates.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Show not found: {0}")]
    ShowNotFound(Uuid),
    #[error("One or more seats are not available")]
    SeatUnavailable {
        requested: Vec<SeatNumber>,
        unavailable: Vec<SeatNumber>,
    },
    #[error("One or more seats are not held or have expired")]
    SeatNotHeld {
        requested: Vec<SeatNumber>,
        not_held: Vec<SeatNumber>,
        held: Vec<SeatNumber>,
    },
    #[error("Storage failure: {0}")]
    StorageFailure(#[source] RepositoryError),
}

impl From<RepositoryError> for ReservationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => ReservationError::ShowNotFound(id),
            RepositoryError::InvalidShow(msg) => ReservationError::InvalidRequest(msg),
            other => ReservationError::StorageFailure(other),
        }
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
