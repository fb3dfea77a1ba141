//! Booking domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::time_range::TimeRange;

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Whether a booking in this status may move to `to`.
    ///
    /// `cancelled` and `completed` are terminal.
    pub fn can_transition_to(self, to: BookingStatus) -> bool {
        matches!(
            (self, to),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    /// Whether participants may still join or leave.
    pub fn is_open(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Only confirmed bookings occupy their slot.
    pub fn blocks_slot(self) -> bool {
        self == BookingStatus::Confirmed
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Who may join a group booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBookingType {
    Public,
    Private,
    InviteOnly,
}

impl std::fmt::Display for GroupBookingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupBookingType::Public => write!(f, "public"),
            GroupBookingType::Private => write!(f, "private"),
            GroupBookingType::InviteOnly => write!(f, "invite_only"),
        }
    }
}

/// A booking of a resource for a time range.
///
/// `current_participants + available_spots == capacity` holds for every
/// persisted booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Booking {
    pub id: Uuid,
    pub organization_id: String,
    pub resource_id: String,
    pub resource_type: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub capacity: i32,
    pub current_participants: i32,
    pub available_spots: i32,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub location: Option<String>,
    pub is_group_booking: bool,
    pub group_size: Option<i32>,
    pub waitlist_enabled: bool,
    pub group_booking_type: Option<GroupBookingType>,
    pub group_organizer_id: Option<String>,
    pub artist_name: Option<String>,
    pub artist_email: Option<String>,
    pub goal_text: Option<String>,
    pub consent_recording: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// The booked slot. Persisted bookings always have `start_time < end_time`.
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn is_invite_only(&self) -> bool {
        self.group_booking_type == Some(GroupBookingType::InviteOnly)
    }

    /// Whether `user_id` organizes this group booking.
    pub fn is_organized_by(&self, user_id: &str) -> bool {
        self.group_organizer_id.as_deref() == Some(user_id)
    }
}

/// A booking about to be inserted.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub organization_id: String,
    pub resource_id: String,
    pub resource_type: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub range: TimeRange,
    pub status: BookingStatus,
    pub capacity: i32,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub location: Option<String>,
    pub is_group_booking: bool,
    pub group_size: Option<i32>,
    pub waitlist_enabled: bool,
    pub group_booking_type: Option<GroupBookingType>,
    pub group_organizer_id: Option<String>,
    pub artist_name: Option<String>,
    pub artist_email: Option<String>,
    pub goal_text: Option<String>,
    pub consent_recording: bool,
    pub created_by: Option<String>,
}

impl NewBooking {
    /// Materializes the row with an empty ledger (`available_spots = capacity`).
    pub fn into_booking(self, id: Uuid, now: DateTime<Utc>) -> Booking {
        Booking {
            id,
            organization_id: self.organization_id,
            resource_id: self.resource_id,
            resource_type: self.resource_type,
            title: self.title,
            description: self.description,
            start_time: self.range.start,
            end_time: self.range.end,
            status: self.status,
            capacity: self.capacity,
            current_participants: 0,
            available_spots: self.capacity,
            price_cents: self.price_cents,
            currency: self.currency,
            location: self.location,
            is_group_booking: self.is_group_booking,
            group_size: self.group_size,
            waitlist_enabled: self.waitlist_enabled,
            group_booking_type: self.group_booking_type,
            group_organizer_id: self.group_organizer_id,
            artist_name: self.artist_name,
            artist_email: self.artist_email,
            goal_text: self.goal_text,
            consent_recording: self.consent_recording,
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

lazy_static::lazy_static! {
    /// Opaque identifiers handed out by the auth provider or the resource catalog.
    static ref IDENTIFIER_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9_.:\-]{1,128}$").unwrap();
}

/// Request to book a slot.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
#[validate(schema(function = "validate_create_booking_times"))]
pub struct CreateBookingRequest {
    #[validate(regex(path = "*IDENTIFIER_REGEX", message = "Invalid org_id"))]
    pub org_id: String,

    #[validate(regex(path = "*IDENTIFIER_REGEX", message = "Invalid resource_id"))]
    pub resource_id: String,

    #[validate(length(max = 50, message = "resource_type must be at most 50 characters"))]
    pub resource_type: Option<String>,

    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    #[validate(length(min = 1, max = 200, message = "artist_name must be 1-200 characters"))]
    pub artist_name: Option<String>,

    #[validate(email(message = "Invalid artist_email format"))]
    pub artist_email: Option<String>,

    #[validate(length(max = 2000, message = "goal_text must be at most 2000 characters"))]
    pub goal_text: Option<String>,

    #[serde(default)]
    pub consent_recording: bool,

    #[validate(range(min = 0, message = "price_cents must be non-negative"))]
    pub price_cents: Option<i64>,

    #[validate(custom(function = "shared::validation::validate_currency_code"))]
    pub currency: Option<String>,

    #[validate(length(max = 500, message = "location must be at most 500 characters"))]
    pub location: Option<String>,
}

fn validate_create_booking_times(request: &CreateBookingRequest) -> Result<(), ValidationError> {
    shared::validation::validate_time_order(request.start_time, request.end_time)
}

impl CreateBookingRequest {
    /// Builds a single-party booking. Requests that pass the availability
    /// check are confirmed immediately.
    pub fn into_new_booking(self, created_by: Option<String>) -> NewBooking {
        let title = self
            .title
            .or_else(|| self.artist_name.as_ref().map(|n| format!("Session with {}", n)))
            .unwrap_or_else(|| "Booking".to_string());

        NewBooking {
            organization_id: self.org_id,
            resource_id: self.resource_id,
            resource_type: self.resource_type,
            title,
            description: self.description,
            range: TimeRange {
                start: self.start_time,
                end: self.end_time,
            },
            status: BookingStatus::Confirmed,
            capacity: 1,
            price_cents: self.price_cents,
            currency: self.currency,
            location: self.location,
            is_group_booking: false,
            group_size: None,
            waitlist_enabled: false,
            group_booking_type: None,
            group_organizer_id: None,
            artist_name: self.artist_name,
            artist_email: self.artist_email,
            goal_text: self.goal_text,
            consent_recording: self.consent_recording,
            created_by,
        }
    }
}

/// Request to create a group booking.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
#[validate(schema(function = "validate_create_group_booking_times"))]
pub struct CreateGroupBookingRequest {
    #[validate(regex(path = "*IDENTIFIER_REGEX", message = "Invalid org_id"))]
    pub org_id: String,

    #[validate(regex(path = "*IDENTIFIER_REGEX", message = "Invalid resource_id"))]
    pub resource_id: String,

    #[validate(length(max = 50, message = "resource_type must be at most 50 characters"))]
    pub resource_type: Option<String>,

    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: i32,

    #[validate(range(min = 0, message = "price_cents must be non-negative"))]
    pub price_cents: Option<i64>,

    #[validate(custom(function = "shared::validation::validate_currency_code"))]
    pub currency: Option<String>,

    #[validate(length(max = 500, message = "location must be at most 500 characters"))]
    pub location: Option<String>,

    #[serde(default = "default_waitlist_enabled")]
    pub waitlist_enabled: bool,

    #[serde(default = "default_group_booking_type")]
    pub group_booking_type: GroupBookingType,
}

fn default_waitlist_enabled() -> bool {
    true
}

fn default_group_booking_type() -> GroupBookingType {
    GroupBookingType::Public
}

fn validate_create_group_booking_times(
    request: &CreateGroupBookingRequest,
) -> Result<(), ValidationError> {
    shared::validation::validate_time_order(request.start_time, request.end_time)
}

impl CreateGroupBookingRequest {
    /// Builds a pending group booking organized by `organizer_id`.
    pub fn into_new_booking(self, organizer_id: String) -> NewBooking {
        NewBooking {
            organization_id: self.org_id,
            resource_id: self.resource_id,
            resource_type: self.resource_type,
            title: self.title,
            description: self.description,
            range: TimeRange {
                start: self.start_time,
                end: self.end_time,
            },
            status: BookingStatus::Pending,
            capacity: self.capacity,
            price_cents: self.price_cents,
            currency: self.currency,
            location: self.location,
            is_group_booking: true,
            group_size: Some(self.capacity),
            waitlist_enabled: self.waitlist_enabled,
            group_booking_type: Some(self.group_booking_type),
            group_organizer_id: Some(organizer_id.clone()),
            artist_name: None,
            artist_email: None,
            goal_text: None,
            consent_recording: false,
            created_by: Some(organizer_id),
        }
    }
}

/// Request to move a booking to another status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

/// Query parameters for listing bookings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListBookingsQuery {
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// Maximum number of bookings returned by one listing.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Store-level filter for booking listings.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub organization_id: Option<String>,
    pub resource_id: Option<String>,
    pub status: Option<BookingStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
}

impl BookingFilter {
    /// Whether `booking` passes the filter. The date window keeps bookings
    /// overlapping `[from, to)`.
    pub fn matches(&self, booking: &Booking) -> bool {
        self.organization_id
            .as_deref()
            .map_or(true, |org| booking.organization_id == org)
            && self
                .resource_id
                .as_deref()
                .map_or(true, |res| booking.resource_id == res)
            && self.status.map_or(true, |s| booking.status == s)
            && self.from.map_or(true, |from| booking.end_time > from)
            && self.to.map_or(true, |to| booking.start_time < to)
    }
}

impl From<ListBookingsQuery> for BookingFilter {
    fn from(query: ListBookingsQuery) -> Self {
        Self {
            organization_id: query.org_id,
            resource_id: query.resource_id,
            status: query.status,
            from: query.from,
            to: query.to,
            limit: query.limit.clamp(1, MAX_LIST_LIMIT),
        }
    }
}

/// Query parameters for an availability check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AvailabilityQuery {
    pub resource_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub exclude_booking_id: Option<Uuid>,
}
