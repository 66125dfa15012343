use async_trait::async_trait;
use uuid::Uuid;

use crate::show::Show;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Show not found: {0}")]
    NotFound(Uuid),
    /// The stored show no longer carries the version the caller read.
    #[error("Show {id} was modified concurrently (expected version {expected_version})")]
    Conflict { id: Uuid, expected_version: i64 },
    #[error("Invalid show: {0}")]
    InvalidShow(String),
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Backend(err.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Durable store of show aggregates.
///
/// `save` is a conditional write: it commits only if the stored show is still
/// at `expected_version`, bumps the version and returns the committed copy.
#[async_trait]
pub trait ShowRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Show, RepositoryError>;

    async fn create(&self, name: &str, total_seats: i32) -> Result<Show, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Show>, RepositoryError>;

    async fn save(&self, show: &Show, expected_version: i64) -> Result<Show, RepositoryError>;

    /// Reachability check for diagnostics.
    async fn ping(&self) -> Result<(), RepositoryError>;

    fn backend_name(&self) -> &'static str;
}

/// Creation rules shared by every backend.
pub fn validate_new_show(name: &str, total_seats: i32) -> Result<(), RepositoryError> {
    if name.trim().is_empty() {
        return Err(RepositoryError::InvalidShow("name is required".to_string()));
    }
    if total_seats < 1 {
        return Err(RepositoryError::InvalidShow(
            "totalSeats must be at least 1".to_string(),
        ));
    }
    Ok(())
}
