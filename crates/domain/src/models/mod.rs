//! Domain models for bookings and group bookings.

pub mod booking;
pub mod group_booking;
pub mod invitation;
pub mod participant;
pub mod time_range;
pub mod waitlist;

pub use booking::{
    AvailabilityQuery, Booking, BookingFilter, BookingStatus, CreateBookingRequest,
    CreateGroupBookingRequest, GroupBookingType, ListBookingsQuery, NewBooking,
    UpdateBookingStatusRequest,
};
pub use group_booking::{
    Change, Departure, Draft, ExpirySweep, GroupBookingDetails, GroupBookingState, JoinOutcome,
    LeaveOutcome, Promotion, Transition,
};
pub use invitation::{
    Invitation, InvitationDecision, InvitationReceipt, InvitationResponse, InvitationStatus,
    RespondInvitationRequest, SendInvitationRequest,
};
pub use participant::{JoinGroupBookingRequest, NewParticipant, Participant, ParticipantStatus};
pub use time_range::TimeRange;
pub use waitlist::{WaitlistEntry, WaitlistStatus};
