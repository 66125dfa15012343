use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use seatline_core::Show;
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/shows/verify/database", get(verify_database))
}

/// GET /api/shows/verify/database
/// Storage reachability plus every show exactly as stored, expired holds included.
async fn verify_database(State(state): State<AppState>) -> Response {
    let repo = state.engine.repository();

    let connection_status = match repo.ping().await {
        Ok(()) => "Connected",
        Err(e) => {
            tracing::warn!("Storage ping failed: {}", e);
            "Disconnected"
        }
    };

    match state.engine.list_shows().await {
        Ok(shows) => Json(json!({
            "success": true,
            "message": "Database verification successful",
            "data": {
                "connectionStatus": connection_status,
                "databaseName": repo.backend_name(),
                "totalShows": shows.len(),
                "shows": shows.iter().map(raw_summary).collect::<Vec<_>>(),
            },
            "timestamp": Utc::now(),
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Database verification failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                    "message": "Database verification failed",
                })),
            )
                .into_response()
        }
    }
}

fn raw_summary(show: &Show) -> Value {
    let occupied = show.booked_seats.len() + show.held_seats.len();
    json!({
        "id": show.id,
        "name": show.name,
        "totalSeats": show.total_seats,
        "bookedSeats": show.booked_seats,
        "bookedSeatsCount": show.booked_seats.len(),
        "heldSeats": show.held_seats.values().collect::<Vec<_>>(),
        "heldSeatsCount": show.held_seats.len(),
        "availableSeats": i64::from(show.total_seats) - occupied as i64,
        "createdAt": show.created_at,
        "updatedAt": show.updated_at,
    })
}
