//! Booking entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Booking, BookingStatus, GroupBookingType};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for booking_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
pub enum BookingStatusDb {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl From<BookingStatusDb> for BookingStatus {
    fn from(db: BookingStatusDb) -> Self {
        match db {
            BookingStatusDb::Pending => BookingStatus::Pending,
            BookingStatusDb::Confirmed => BookingStatus::Confirmed,
            BookingStatusDb::Cancelled => BookingStatus::Cancelled,
            BookingStatusDb::Completed => BookingStatus::Completed,
        }
    }
}

impl From<BookingStatus> for BookingStatusDb {
    fn from(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Pending => BookingStatusDb::Pending,
            BookingStatus::Confirmed => BookingStatusDb::Confirmed,
            BookingStatus::Cancelled => BookingStatusDb::Cancelled,
            BookingStatus::Completed => BookingStatusDb::Completed,
        }
    }
}

/// Database enum for group_booking_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "group_booking_type", rename_all = "snake_case")]
pub enum GroupBookingTypeDb {
    Public,
    Private,
    InviteOnly,
}

impl From<GroupBookingTypeDb> for GroupBookingType {
    fn from(db: GroupBookingTypeDb) -> Self {
        match db {
            GroupBookingTypeDb::Public => GroupBookingType::Public,
            GroupBookingTypeDb::Private => GroupBookingType::Private,
            GroupBookingTypeDb::InviteOnly => GroupBookingType::InviteOnly,
        }
    }
}

impl From<GroupBookingType> for GroupBookingTypeDb {
    fn from(kind: GroupBookingType) -> Self {
        match kind {
            GroupBookingType::Public => GroupBookingTypeDb::Public,
            GroupBookingType::Private => GroupBookingTypeDb::Private,
            GroupBookingType::InviteOnly => GroupBookingTypeDb::InviteOnly,
        }
    }
}

/// Column list shared by every query returning [`BookingEntity`].
pub const BOOKING_COLUMNS: &str = "id, organization_id, resource_id, resource_type, title, \
     description, start_time, end_time, status, capacity, current_participants, \
     available_spots, price_cents, currency, location, is_group_booking, group_size, \
     waitlist_enabled, group_booking_type, group_organizer_id, artist_name, artist_email, \
     goal_text, consent_recording, created_by, created_at, updated_at";

/// Database row mapping for the bookings table.
#[derive(Debug, Clone, FromRow)]
pub struct BookingEntity {
    pub id: Uuid,
    pub organization_id: String,
    pub resource_id: String,
    pub resource_type: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatusDb,
    pub capacity: i32,
    pub current_participants: i32,
    pub available_spots: i32,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub location: Option<String>,
    pub is_group_booking: bool,
    pub group_size: Option<i32>,
    pub waitlist_enabled: bool,
    pub group_booking_type: Option<GroupBookingTypeDb>,
    pub group_organizer_id: Option<String>,
    pub artist_name: Option<String>,
    pub artist_email: Option<String>,
    pub goal_text: Option<String>,
    pub consent_recording: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookingEntity> for Booking {
    fn from(entity: BookingEntity) -> Self {
        Self {
            id: entity.id,
            organization_id: entity.organization_id,
            resource_id: entity.resource_id,
            resource_type: entity.resource_type,
            title: entity.title,
            description: entity.description,
            start_time: entity.start_time,
            end_time: entity.end_time,
            status: entity.status.into(),
            capacity: entity.capacity,
            current_participants: entity.current_participants,
            available_spots: entity.available_spots,
            price_cents: entity.price_cents,
            currency: entity.currency,
            location: entity.location,
            is_group_booking: entity.is_group_booking,
            group_size: entity.group_size,
            waitlist_enabled: entity.waitlist_enabled,
            group_booking_type: entity.group_booking_type.map(Into::into),
            group_organizer_id: entity.group_organizer_id,
            artist_name: entity.artist_name,
            artist_email: entity.artist_email,
            goal_text: entity.goal_text,
            consent_recording: entity.consent_recording,
            created_by: entity.created_by,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(BookingStatus::from(BookingStatusDb::from(status)), status);
        }
    }

    #[test]
    fn test_entity_to_domain() {
        let now = Utc::now();
        let entity = BookingEntity {
            id: Uuid::new_v4(),
            organization_id: "org_1".to_string(),
            resource_id: "room-1".to_string(),
            resource_type: None,
            title: "Workshop".to_string(),
            description: None,
            start_time: now,
            end_time: now + chrono::Duration::hours(1),
            status: BookingStatusDb::Pending,
            capacity: 8,
            current_participants: 3,
            available_spots: 5,
            price_cents: Some(1500),
            currency: Some("EUR".to_string()),
            location: None,
            is_group_booking: true,
            group_size: Some(8),
            waitlist_enabled: true,
            group_booking_type: Some(GroupBookingTypeDb::InviteOnly),
            group_organizer_id: Some("user_org".to_string()),
            artist_name: None,
            artist_email: None,
            goal_text: None,
            consent_recording: false,
            created_by: Some("user_org".to_string()),
            created_at: now,
            updated_at: now,
        };

        let booking: Booking = entity.into();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.group_booking_type, Some(GroupBookingType::InviteOnly));
        assert!(booking.is_invite_only());
        assert_eq!(booking.available_spots, 5);
    }
}
