//! Booking services.
//!
//! The capacity, waitlist, invitation and availability modules are pure
//! functions over the models. [`BookingService`] and [`GroupBookingService`]
//! compose them with a [`BookingStore`] and a [`BookingNotifier`].

pub mod availability;
pub mod booking;
pub mod capacity;
pub mod group_booking;
pub mod invitation;
pub mod memory_store;
pub mod notification;
pub mod store;
pub mod waitlist;

pub use availability::{check_availability, AvailabilityResult, ConflictingBooking};
pub use booking::BookingService;
pub use capacity::{CapacityLedger, JoinPath};
pub use group_booking::{GroupBookingService, GroupBookingSettings};
pub use memory_store::InMemoryBookingStore;
pub use notification::{
    BookingNotifier, MockNotifier, NotificationKind, NotificationResult, SentNotification,
};
pub use store::BookingStore;
