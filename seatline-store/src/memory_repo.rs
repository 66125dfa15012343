use async_trait::async_trait;
use seatline_core::repository::{validate_new_show, RepositoryError, ShowRepository};
use seatline_core::{Clock, Show, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local show store with the same conditional-save contract as the
/// Postgres repository. The map lock is held only for the duration of a
/// single get/save, never across an engine operation.
///
/// `created_at`/`updated_at` come from the injected clock, which should be
/// the one the engine runs on.
pub struct InMemoryShowRepository {
    shows: RwLock<HashMap<Uuid, Show>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryShowRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            shows: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for InMemoryShowRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShowRepository for InMemoryShowRepository {
    async fn get(&self, id: Uuid) -> Result<Show, RepositoryError> {
        self.shows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn create(&self, name: &str, total_seats: i32) -> Result<Show, RepositoryError> {
        validate_new_show(name, total_seats)?;

        let show = Show::new(name, total_seats, self.clock.now());
        self.shows.write().await.insert(show.id, show.clone());
        Ok(show)
    }

    async fn list_all(&self) -> Result<Vec<Show>, RepositoryError> {
        let mut shows: Vec<Show> = self.shows.read().await.values().cloned().collect();
        shows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(shows)
    }

    async fn save(&self, show: &Show, expected_version: i64) -> Result<Show, RepositoryError> {
        let mut shows = self.shows.write().await;
        let stored = shows
            .get_mut(&show.id)
            .ok_or(RepositoryError::NotFound(show.id))?;

        if stored.version != expected_version {
            return Err(RepositoryError::Conflict {
                id: show.id,
                expected_version,
            });
        }

        let mut committed = show.clone();
        committed.version = expected_version + 1;
        committed.created_at = stored.created_at;
        committed.updated_at = self.clock.now();
        *stored = committed.clone();

        Ok(committed)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
