//! Storage boundary for bookings and group bookings.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::BookingResult;
use crate::models::{
    Booking, BookingFilter, BookingStatus, Draft, ExpirySweep, GroupBookingState, Invitation,
    NewBooking, TimeRange, Transition,
};

/// Durable booking storage.
///
/// Implementations must make two things atomic:
///
/// - [`insert_booking`](BookingStore::insert_booking) and
///   [`transition_status`](BookingStore::transition_status) check for
///   overlapping confirmed bookings and write in one critical section per
///   resource, failing with `SlotTaken` on overlap.
/// - [`transact`](BookingStore::transact) serializes all operations on one
///   booking and persists the recorded changes all-or-nothing.
#[async_trait::async_trait]
pub trait BookingStore: Send + Sync + 'static {
    async fn list_bookings(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>>;

    async fn find_booking(&self, id: Uuid) -> BookingResult<Option<Booking>>;

    /// Confirmed bookings of `resource_id` overlapping `range`.
    async fn confirmed_bookings_overlapping(
        &self,
        resource_id: &str,
        range: &TimeRange,
    ) -> BookingResult<Vec<Booking>>;

    /// Inserts a booking. A confirmed booking is only inserted if its slot
    /// is still free.
    async fn insert_booking(&self, new_booking: NewBooking) -> BookingResult<Booking>;

    /// Moves a booking to `to`. Confirming re-checks the slot, ignoring the
    /// booking itself.
    async fn transition_status(&self, id: Uuid, to: BookingStatus) -> BookingResult<Booking>;

    async fn load_group(&self, booking_id: Uuid) -> BookingResult<Option<GroupBookingState>>;

    async fn find_invitation_by_token_hash(
        &self,
        token_hash: &str,
    ) -> BookingResult<Option<Invitation>>;

    /// Runs `operation` against the current state of a group booking while
    /// holding that booking exclusively, then persists the changes it
    /// recorded.
    ///
    /// Changes are persisted even when the operation's result is an error.
    /// Fails with not-found when the booking does not exist.
    async fn transact<T, F>(&self, booking_id: Uuid, operation: F) -> BookingResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Draft) -> Transition<T> + Send + 'static;

    /// Marks pending invitations and waitlist entries past their deadline as
    /// expired.
    async fn expire_stale(&self, now: DateTime<Utc>) -> BookingResult<ExpirySweep>;
}
