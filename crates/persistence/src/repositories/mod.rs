//! Repository implementations for database operations.

pub mod booking;
pub mod group_booking;

pub use booking::BookingRepository;
pub use group_booking::GroupBookingRepository;
