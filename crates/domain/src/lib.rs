//! Domain layer for the arts booking backend.
//!
//! This crate contains:
//! - Domain models (Booking, Participant, WaitlistEntry, Invitation)
//! - Booking logic: availability, capacity ledger, waitlist, invitations
//! - The storage boundary and the services orchestrating it
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::{BookingError, BookingResult};
