use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use seatline_core::{Availability, SeatNumber, Show, ShowStats};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiJson, AppError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShowRequest {
    pub name: Option<String>,
    pub total_seats: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldSeatsRequest {
    pub seat_numbers: Option<Vec<SeatNumber>>,
    pub hold_duration_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSeatsRequest {
    pub seat_numbers: Option<Vec<SeatNumber>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldSeatsResponse {
    pub success: bool,
    pub message: &'static str,
    pub show_id: Uuid,
    pub held_seats: Vec<SeatNumber>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSeatsResponse {
    pub success: bool,
    pub message: &'static str,
    pub show_id: Uuid,
    pub booked_seats: Vec<SeatNumber>,
    pub booking_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/shows", post(create_show).get(list_shows))
        .route("/api/shows/{show_id}/availability", get(get_availability))
        .route("/api/shows/{show_id}/hold", post(hold_seats))
        .route("/api/shows/{show_id}/book", post(book_seats))
        .route("/api/shows/{show_id}/stats", get(get_stats))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/shows
async fn create_show(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateShowRequest>,
) -> Result<(StatusCode, Json<Show>), AppError> {
    let name = req.name.filter(|n| !n.trim().is_empty());
    let total_seats = req
        .total_seats
        .filter(|n| *n >= 1)
        .and_then(|n| i32::try_from(n).ok());

    let (Some(name), Some(total_seats)) = (name, total_seats) else {
        return Err(AppError::ValidationError(
            "Name and totalSeats (>= 1) are required".to_string(),
        ));
    };

    let result = state.engine.create_show(&name, total_seats).await;
    state.metrics.observe("create_show", &result);
    let show = result?;

    tracing::info!(show_id = %show.id, total_seats, "Show created");
    Ok((StatusCode::CREATED, Json(show)))
}

/// GET /api/shows
async fn list_shows(State(state): State<AppState>) -> Result<Json<Vec<Show>>, AppError> {
    let result = state.engine.list_shows().await;
    state.metrics.observe("list_shows", &result);
    Ok(Json(result?))
}

/// GET /api/shows/{show_id}/availability
async fn get_availability(
    State(state): State<AppState>,
    Path(show_id): Path<String>,
) -> Result<Json<Availability>, AppError> {
    let show_id = parse_show_id(&show_id)?;
    let result = state.engine.check_availability(show_id).await;
    state.metrics.observe("availability", &result);
    Ok(Json(result?))
}

/// POST /api/shows/{show_id}/hold
async fn hold_seats(
    State(state): State<AppState>,
    Path(show_id): Path<String>,
    ApiJson(req): ApiJson<HoldSeatsRequest>,
) -> Result<Json<HoldSeatsResponse>, AppError> {
    let seat_numbers = required_seats(req.seat_numbers)?;
    let show_id = parse_show_id(&show_id)?;

    let result = state
        .engine
        .hold(show_id, &seat_numbers, req.hold_duration_minutes)
        .await;
    state.metrics.observe("hold", &result);
    let hold = result?;
    state.metrics.record_held(hold.held_seats.len());

    Ok(Json(HoldSeatsResponse {
        success: true,
        message: "Seats held successfully",
        show_id: hold.show_id,
        held_seats: hold.held_seats,
        expires_at: hold.expires_at,
    }))
}

/// POST /api/shows/{show_id}/book
async fn book_seats(
    State(state): State<AppState>,
    Path(show_id): Path<String>,
    ApiJson(req): ApiJson<BookSeatsRequest>,
) -> Result<Json<BookSeatsResponse>, AppError> {
    let seat_numbers = required_seats(req.seat_numbers)?;
    let show_id = parse_show_id(&show_id)?;

    let result = state.engine.book(show_id, &seat_numbers).await;
    state.metrics.observe("book", &result);
    let booking = result?;
    state.metrics.record_booked(booking.booked_seats.len());

    Ok(Json(BookSeatsResponse {
        success: true,
        message: "Seats booked successfully",
        show_id: booking.show_id,
        booked_seats: booking.booked_seats,
        booking_id: booking.booking_id,
    }))
}

/// GET /api/shows/{show_id}/stats
async fn get_stats(
    State(state): State<AppState>,
    Path(show_id): Path<String>,
) -> Result<Json<ShowStats>, AppError> {
    let show_id = parse_show_id(&show_id)?;
    let result = state.engine.stats(show_id).await;
    state.metrics.observe("stats", &result);
    Ok(Json(result?))
}

/// An id that cannot name a show is reported the same as an unknown one.
fn parse_show_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFoundError("Show not found".to_string()))
}

fn required_seats(seats: Option<Vec<SeatNumber>>) -> Result<Vec<SeatNumber>, AppError> {
    match seats {
        Some(seats) if !seats.is_empty() => Ok(seats),
        _ => Err(AppError::ValidationError(
            "seatNumbers array is required".to_string(),
        )),
    }
}
