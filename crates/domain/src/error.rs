//! Domain error types for booking operations.

use thiserror::Error;
use uuid::Uuid;

use crate::models::BookingStatus;

/// Errors produced by booking, capacity, waitlist and invitation operations.
///
/// Every public service operation returns this type so HTTP handlers can map
/// failures to status codes without inspecting messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Time slot is already booked")]
    SlotTaken { conflicting_bookings: Vec<Uuid> },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Booking is full")]
    BookingFull,

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cannot change booking status from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Capacity invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl BookingError {
    /// Shorthand for a not-found error about a group booking.
    pub fn group_booking_not_found() -> Self {
        BookingError::NotFound("Group booking not found".to_string())
    }
}

/// Result alias used throughout the domain crate.
pub type BookingResult<T> = Result<T, BookingError>;
