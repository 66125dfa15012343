use async_trait::async_trait;
use chrono::{DateTime, Utc};
use seatline_core::repository::{validate_new_show, RepositoryError, ShowRepository};
use seatline_core::{HeldSeat, Show};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const SHOW_COLUMNS: &str =
    "id, name, total_seats, booked_seats, held_seats, version, created_at, updated_at";

/// Postgres-backed show store. Each show is one row; the hold index is a
/// JSONB array and `version` guards every update.
pub struct PgShowRepository {
    pool: PgPool,
}

impl PgShowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM shows WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::backend)
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct ShowRow {
    id: Uuid,
    name: String,
    total_seats: i32,
    booked_seats: Vec<i64>,
    held_seats: Json<Vec<HeldSeat>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ShowRow> for Show {
    fn from(row: ShowRow) -> Self {
        Show {
            id: row.id,
            name: row.name,
            total_seats: row.total_seats,
            booked_seats: row.booked_seats,
            held_seats: row
                .held_seats
                .0
                .into_iter()
                .map(|hold| (hold.seat_number, hold))
                .collect(),
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ShowRepository for PgShowRepository {
    async fn get(&self, id: Uuid) -> Result<Show, RepositoryError> {
        let row = sqlx::query_as::<_, ShowRow>(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        row.map(Show::from).ok_or(RepositoryError::NotFound(id))
    }

    async fn create(&self, name: &str, total_seats: i32) -> Result<Show, RepositoryError> {
        validate_new_show(name, total_seats)?;

        let row = sqlx::query_as::<_, ShowRow>(&format!(
            r#"
            INSERT INTO shows (id, name, total_seats, booked_seats, held_seats, version, created_at, updated_at)
            VALUES ($1, $2, $3, '{{}}', '[]'::jsonb, 0, NOW(), NOW())
            RETURNING {SHOW_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(total_seats)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        Ok(row.into())
    }

    async fn list_all(&self) -> Result<Vec<Show>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShowRow>(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        Ok(rows.into_iter().map(Show::from).collect())
    }

    async fn save(&self, show: &Show, expected_version: i64) -> Result<Show, RepositoryError> {
        let holds: Vec<&HeldSeat> = show.held_seats.values().collect();

        let row = sqlx::query_as::<_, ShowRow>(&format!(
            r#"
            UPDATE shows
            SET booked_seats = $2, held_seats = $3, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $4
            RETURNING {SHOW_COLUMNS}
            "#
        ))
        .bind(show.id)
        .bind(&show.booked_seats)
        .bind(Json(holds))
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        match row {
            Some(row) => Ok(row.into()),
            None if self.exists(show.id).await? => Err(RepositoryError::Conflict {
                id: show.id,
                expected_version,
            }),
            None => Err(RepositoryError::NotFound(show.id)),
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
