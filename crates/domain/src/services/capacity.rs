//! Capacity ledger and the join/leave operations built on it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::waitlist;
use crate::error::{BookingError, BookingResult};
use crate::models::{
    Booking, Change, Departure, Draft, JoinOutcome, LeaveOutcome, NewParticipant, Participant,
    ParticipantStatus, WaitlistStatus,
};

/// Spot counters of one booking.
///
/// `current_participants + available_spots == capacity` and
/// `0 <= current_participants <= capacity` hold before and after every
/// successful mutation. A mutation that would break them is rejected and
/// leaves the ledger unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityLedger {
    pub capacity: i32,
    pub current_participants: i32,
    pub available_spots: i32,
}

impl CapacityLedger {
    /// An empty ledger. Capacity must be at least 1.
    pub fn new(capacity: i32) -> BookingResult<Self> {
        if capacity < 1 {
            return Err(BookingError::Validation(
                "capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            current_participants: 0,
            available_spots: capacity,
        })
    }

    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            capacity: booking.capacity,
            current_participants: booking.current_participants,
            available_spots: booking.available_spots,
        }
    }

    pub fn check(&self) -> BookingResult<()> {
        if self.current_participants < 0 || self.available_spots < 0 {
            return Err(BookingError::InvariantViolation(format!(
                "negative counters (current_participants={}, available_spots={})",
                self.current_participants, self.available_spots
            )));
        }
        if self.current_participants + self.available_spots != self.capacity {
            return Err(BookingError::InvariantViolation(format!(
                "current_participants ({}) + available_spots ({}) != capacity ({})",
                self.current_participants, self.available_spots, self.capacity
            )));
        }
        Ok(())
    }

    pub fn has_space(&self) -> bool {
        self.available_spots > 0
    }

    /// Takes one spot.
    pub fn reserve(&mut self) -> BookingResult<()> {
        self.check()?;
        if !self.has_space() {
            return Err(BookingError::BookingFull);
        }
        self.available_spots -= 1;
        self.current_participants += 1;
        Ok(())
    }

    /// Gives one spot back.
    pub fn release(&mut self) -> BookingResult<()> {
        self.check()?;
        if self.current_participants == 0 {
            return Err(BookingError::InvariantViolation(
                "cannot release a spot on an empty booking".to_string(),
            ));
        }
        self.available_spots += 1;
        self.current_participants -= 1;
        Ok(())
    }

    pub fn write_to(&self, booking: &mut Booking) {
        booking.capacity = self.capacity;
        booking.current_participants = self.current_participants;
        booking.available_spots = self.available_spots;
    }
}

/// How a join request reached the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPath {
    /// The user asked to join.
    Direct,
    /// The user accepted an invitation.
    Invitation,
}

/// Adds a user to a group booking, or queues them when it is full.
pub fn join(
    draft: &mut Draft,
    new_participant: NewParticipant,
    path: JoinPath,
    now: DateTime<Utc>,
) -> BookingResult<JoinOutcome> {
    let state = draft.state();
    let booking = &state.booking;

    if !booking.is_group_booking {
        return Err(BookingError::group_booking_not_found());
    }
    if !booking.status.is_open() {
        return Err(BookingError::Conflict(format!(
            "Cannot join a {} booking",
            booking.status
        )));
    }
    if booking.is_invite_only() && path == JoinPath::Direct {
        return Err(BookingError::Forbidden(
            "This group booking is invite only".to_string(),
        ));
    }
    if state.active_participant(&new_participant.user_id).is_some() {
        return Err(BookingError::Conflict(
            "User is already a participant".to_string(),
        ));
    }
    if state.pending_waitlist_entry(&new_participant.user_id).is_some() {
        return Err(BookingError::Conflict(
            "User is already on the waitlist".to_string(),
        ));
    }

    if state.ledger().has_space() {
        let participant = Participant {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            user_id: new_participant.user_id,
            display_name: new_participant.display_name,
            email: new_participant.email,
            phone: new_participant.phone,
            status: ParticipantStatus::Confirmed,
            role: new_participant.role,
            notes: new_participant.notes,
            registered_at: now,
            confirmed_at: Some(now),
            cancelled_at: None,
            metadata: new_participant.metadata,
        };

        draft.record(Change::SpotReserved)?;
        draft.record(Change::ParticipantAdded(participant.clone()))?;

        return Ok(JoinOutcome::Confirmed {
            participant,
            available_spots: draft.state().booking.available_spots,
        });
    }

    if !booking.waitlist_enabled {
        return Err(BookingError::BookingFull);
    }

    let entry = waitlist::enqueue(draft, new_participant, now)?;
    Ok(JoinOutcome::Waitlisted {
        position: entry.position,
        entry,
        available_spots: draft.state().booking.available_spots,
    })
}

/// Removes a user from a group booking.
///
/// A participant holding a spot frees it and the head of the waitlist is
/// promoted into it. A user who is only waiting has their entry cancelled
/// and the counters stay untouched.
pub fn leave(draft: &mut Draft, user_id: &str, now: DateTime<Utc>) -> BookingResult<LeaveOutcome> {
    let state = draft.state();
    let booking = &state.booking;

    if !booking.is_group_booking {
        return Err(BookingError::group_booking_not_found());
    }
    if !booking.status.is_open() {
        return Err(BookingError::Conflict(format!(
            "Cannot leave a {} booking",
            booking.status
        )));
    }

    if let Some(participant) = state.active_participant(user_id).cloned() {
        draft.record(Change::ParticipantCancelled {
            participant_id: participant.id,
            at: now,
        })?;

        let promoted = if participant.status.holds_spot() {
            draft.record(Change::SpotReleased)?;
            waitlist::promote_next(draft, now)?
        } else {
            None
        };

        let mut cancelled = participant;
        cancelled.status = ParticipantStatus::Cancelled;
        cancelled.cancelled_at = Some(now);

        return Ok(LeaveOutcome {
            departure: Departure::Participant {
                participant: cancelled,
            },
            available_spots: draft.state().booking.available_spots,
            promoted,
        });
    }

    if let Some(entry) = state.pending_waitlist_entry(user_id).cloned() {
        draft.record(Change::WaitlistStatusChanged {
            entry_id: entry.id,
            status: WaitlistStatus::Cancelled,
            at: now,
        })?;

        let mut cancelled = entry;
        cancelled.status = WaitlistStatus::Cancelled;

        return Ok(LeaveOutcome {
            departure: Departure::Waitlist { entry: cancelled },
            available_spots: draft.state().booking.available_spots,
            promoted: None,
        });
    }

    Err(BookingError::NotFound("Participant not found".to_string()))
}
