use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use seatline_core::ReservationError;
use serde_json::{json, Value};

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError { message: String, details: Value },
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, Value::Null),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, Value::Null),
            AppError::ConflictError { message, details } => (StatusCode::CONFLICT, message, details),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), Value::Null)
            },
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), Value::Null)
            },
        };

        let mut body = json!({
            "error": error_message,
        });
        if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), details) {
            body.extend(extra);
        }

        (status, Json(body)).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::InvalidRequest(msg) => AppError::ValidationError(msg),
            ReservationError::ShowNotFound(_) => AppError::NotFoundError("Show not found".to_string()),
            ReservationError::SeatUnavailable { ref requested, .. } => AppError::ConflictError {
                message: err.to_string(),
                details: json!({ "requestedSeats": requested }),
            },
            ReservationError::SeatNotHeld { ref requested, ref held, .. } => AppError::ConflictError {
                message: err.to_string(),
                details: json!({ "requestedSeats": requested, "heldSeats": held }),
            },
            ReservationError::StorageFailure(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

/// `Json` extractor whose rejections render as 400 with the usual error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
