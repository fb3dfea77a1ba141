//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod booking;
pub mod group_booking;

pub use booking::{BookingEntity, BookingStatusDb, GroupBookingTypeDb, BOOKING_COLUMNS};
pub use group_booking::{
    InvitationEntity, InvitationStatusDb, ParticipantEntity, ParticipantStatusDb,
    WaitlistEntryEntity, WaitlistStatusDb,
};
