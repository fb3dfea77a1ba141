//! Slot availability checks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Booking, TimeRange};

/// Reason reported when a candidate range overlaps a confirmed booking.
pub const SLOT_TAKEN_REASON: &str = "Time slot is already booked";

/// A confirmed booking that blocks a candidate range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ConflictingBooking {
    pub id: Uuid,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&Booking> for ConflictingBooking {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            title: booking.title.clone(),
            start_time: booking.start_time,
            end_time: booking.end_time,
        }
    }
}

/// Answer to "is this resource free for this range?".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AvailabilityResult {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicting_bookings: Vec<ConflictingBooking>,
}

impl AvailabilityResult {
    pub fn available() -> Self {
        Self {
            available: true,
            reason: None,
            conflicting_bookings: Vec::new(),
        }
    }

    pub fn conflicting_ids(&self) -> Vec<Uuid> {
        self.conflicting_bookings.iter().map(|b| b.id).collect()
    }
}

/// Confirmed bookings of `resource_id` overlapping `candidate`.
///
/// Pending, cancelled and completed bookings never block. `exclude` skips a
/// booking being re-checked against its own slot.
pub fn find_conflicts<'a>(
    resource_id: &str,
    candidate: &TimeRange,
    existing: &'a [Booking],
    exclude: Option<Uuid>,
) -> Vec<&'a Booking> {
    existing
        .iter()
        .filter(|b| b.resource_id == resource_id)
        .filter(|b| b.status.blocks_slot())
        .filter(|b| Some(b.id) != exclude)
        .filter(|b| b.time_range().overlaps(candidate))
        .collect()
}

/// Checks `candidate` against the bookings of a resource.
pub fn check_availability(
    resource_id: &str,
    candidate: &TimeRange,
    existing: &[Booking],
    exclude: Option<Uuid>,
) -> AvailabilityResult {
    let conflicts = find_conflicts(resource_id, candidate, existing, exclude);
    if conflicts.is_empty() {
        return AvailabilityResult::available();
    }

    AvailabilityResult {
        available: false,
        reason: Some(SLOT_TAKEN_REASON.to_string()),
        conflicting_bookings: conflicts.into_iter().map(ConflictingBooking::from).collect(),
    }
}
