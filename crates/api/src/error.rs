use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::BookingError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Time slot is already booked")]
    SlotTaken(Vec<Uuid>),

    #[error("Booking is full")]
    BookingFull,

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflicting_bookings: Option<Vec<Uuid>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut conflicting_bookings = None;
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::SlotTaken(ids) => {
                if !ids.is_empty() {
                    conflicting_bookings = Some(ids);
                }
                (
                    StatusCode::CONFLICT,
                    "slot_taken",
                    "Time slot is already booked".into(),
                )
            }
            ApiError::BookingFull => (
                StatusCode::CONFLICT,
                "booking_full",
                "Booking is full".into(),
            ),
            ApiError::Gone(msg) => (StatusCode::GONE, "expired", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorBody {
            success: false,
            error: error_code.into(),
            message,
            conflicting_bookings,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(msg) => ApiError::Validation(msg),
            BookingError::NotFound(msg) => ApiError::NotFound(msg),
            BookingError::SlotTaken {
                conflicting_bookings,
            } => ApiError::SlotTaken(conflicting_bookings),
            BookingError::Conflict(msg) => ApiError::Conflict(msg),
            BookingError::BookingFull => ApiError::BookingFull,
            BookingError::Expired(msg) => ApiError::Gone(msg),
            BookingError::Forbidden(msg) => ApiError::Forbidden(msg),
            err @ BookingError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            err @ (BookingError::InvariantViolation(_) | BookingError::Backend(_)) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();

        // field_errors() is a HashMap
        messages.sort();
        ApiError::Validation(messages.join(", "))
    }
}
