//! Group booking aggregate and the changes that mutate it.
//!
//! A [`GroupBookingState`] is the booking row plus its participants, waitlist
//! and invitations. Operations never mutate it in place; they record
//! [`Change`]s on a [`Draft`], and the store applies the same changes to
//! durable storage inside one transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::booking::Booking;
use super::invitation::{Invitation, InvitationStatus};
use super::participant::{Participant, ParticipantStatus};
use super::waitlist::{WaitlistEntry, WaitlistStatus};
use crate::error::{BookingError, BookingResult};
use crate::services::capacity::CapacityLedger;

/// A group booking with everything attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBookingState {
    pub booking: Booking,
    pub participants: Vec<Participant>,
    pub waitlist: Vec<WaitlistEntry>,
    pub invitations: Vec<Invitation>,
}

/// One atomic mutation of a group booking.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Move one unit of capacity from available to taken.
    SpotReserved,
    /// Move one unit of capacity from taken to available.
    SpotReleased,
    ParticipantAdded(Participant),
    ParticipantCancelled {
        participant_id: Uuid,
        at: DateTime<Utc>,
    },
    WaitlistAdded(WaitlistEntry),
    WaitlistStatusChanged {
        entry_id: Uuid,
        status: WaitlistStatus,
        at: DateTime<Utc>,
    },
    InvitationAdded(Invitation),
    InvitationResolved {
        invitation_id: Uuid,
        status: InvitationStatus,
        at: DateTime<Utc>,
        invitee_user_id: Option<String>,
    },
}

impl GroupBookingState {
    pub fn new(booking: Booking) -> Self {
        Self {
            booking,
            participants: Vec::new(),
            waitlist: Vec::new(),
            invitations: Vec::new(),
        }
    }

    pub fn ledger(&self) -> CapacityLedger {
        CapacityLedger::from_booking(&self.booking)
    }

    /// The user's non-cancelled participation, if any.
    pub fn active_participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.user_id == user_id && p.status.is_active())
    }

    /// The user's queued waitlist entry, if any.
    pub fn pending_waitlist_entry(&self, user_id: &str) -> Option<&WaitlistEntry> {
        self.waitlist
            .iter()
            .find(|e| e.user_id == user_id && e.status.is_pending())
    }

    pub fn waitlist_entry(&self, entry_id: Uuid) -> Option<&WaitlistEntry> {
        self.waitlist.iter().find(|e| e.id == entry_id)
    }

    /// Queued entries in position order.
    pub fn pending_waitlist(&self) -> Vec<&WaitlistEntry> {
        let mut pending: Vec<&WaitlistEntry> = self
            .waitlist
            .iter()
            .filter(|e| e.status.is_pending())
            .collect();
        pending.sort_by_key(|e| e.position);
        pending
    }

    pub fn invitation(&self, invitation_id: Uuid) -> Option<&Invitation> {
        self.invitations.iter().find(|i| i.id == invitation_id)
    }

    /// A pending invitation for `email` (already lowercased).
    pub fn pending_invitation_for(&self, email: &str) -> Option<&Invitation> {
        self.invitations
            .iter()
            .find(|i| i.status == InvitationStatus::Pending && i.invitee_email == email)
    }

    /// Checks the ledger arithmetic and that the counters match the
    /// participants actually holding a spot.
    pub fn verify(&self) -> BookingResult<()> {
        self.ledger().check()?;

        let holding = self
            .participants
            .iter()
            .filter(|p| p.status.holds_spot())
            .count() as i32;
        if holding != self.booking.current_participants {
            return Err(BookingError::InvariantViolation(format!(
                "{} participants hold a spot but current_participants is {}",
                holding, self.booking.current_participants
            )));
        }
        Ok(())
    }

    /// Applies one change in memory.
    pub fn apply(&mut self, change: &Change) -> BookingResult<()> {
        match change {
            Change::SpotReserved => {
                let mut ledger = self.ledger();
                ledger.reserve()?;
                ledger.write_to(&mut self.booking);
            }
            Change::SpotReleased => {
                let mut ledger = self.ledger();
                ledger.release()?;
                ledger.write_to(&mut self.booking);
            }
            Change::ParticipantAdded(participant) => {
                if self.active_participant(&participant.user_id).is_some() {
                    return Err(BookingError::Conflict(
                        "User is already a participant".to_string(),
                    ));
                }
                self.participants.push(participant.clone());
            }
            Change::ParticipantCancelled { participant_id, at } => {
                let participant = self
                    .participants
                    .iter_mut()
                    .find(|p| p.id == *participant_id && p.status.is_active())
                    .ok_or_else(|| BookingError::NotFound("Participant not found".to_string()))?;
                participant.status = ParticipantStatus::Cancelled;
                participant.cancelled_at = Some(*at);
            }
            Change::WaitlistAdded(entry) => {
                if self.waitlist.iter().any(|e| e.position == entry.position) {
                    return Err(BookingError::InvariantViolation(format!(
                        "waitlist position {} is already taken",
                        entry.position
                    )));
                }
                self.waitlist.push(entry.clone());
            }
            Change::WaitlistStatusChanged {
                entry_id,
                status,
                at,
            } => {
                let entry = self
                    .waitlist
                    .iter_mut()
                    .find(|e| e.id == *entry_id)
                    .ok_or_else(|| {
                        BookingError::NotFound("Waitlist entry not found".to_string())
                    })?;
                entry.status = *status;
                match status {
                    WaitlistStatus::Notified => entry.notified_at = Some(*at),
                    WaitlistStatus::Converted => entry.converted_at = Some(*at),
                    _ => {}
                }
            }
            Change::InvitationAdded(invitation) => {
                self.invitations.push(invitation.clone());
            }
            Change::InvitationResolved {
                invitation_id,
                status,
                at,
                invitee_user_id,
            } => {
                let invitation = self
                    .invitations
                    .iter_mut()
                    .find(|i| i.id == *invitation_id)
                    .ok_or_else(|| BookingError::NotFound("Invitation not found".to_string()))?;
                invitation.status = *status;
                if *status != InvitationStatus::Expired {
                    invitation.responded_at = Some(*at);
                }
                if invitee_user_id.is_some() {
                    invitation.invitee_user_id = invitee_user_id.clone();
                }
            }
        }
        Ok(())
    }
}

/// Working copy of a group booking that records every change applied to it.
#[derive(Debug, Clone)]
pub struct Draft {
    state: GroupBookingState,
    changes: Vec<Change>,
}

impl Draft {
    pub fn new(state: GroupBookingState) -> Self {
        Self {
            state,
            changes: Vec::new(),
        }
    }

    pub fn state(&self) -> &GroupBookingState {
        &self.state
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Applies `change` and keeps it for persistence. A rejected change is
    /// not recorded.
    pub fn record(&mut self, change: Change) -> BookingResult<()> {
        self.state.apply(&change)?;
        self.changes.push(change);
        Ok(())
    }

    /// Ends the operation. Recorded changes are persisted even when `result`
    /// is an error, so lazy expiry survives a failed request.
    pub fn finish<T>(self, result: BookingResult<T>) -> Transition<T> {
        Transition {
            changes: self.changes,
            result,
        }
    }
}

/// Changes to persist plus the operation's outcome.
#[derive(Debug)]
pub struct Transition<T> {
    pub changes: Vec<Change>,
    pub result: BookingResult<T>,
}

/// Result of a join.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JoinOutcome {
    Confirmed {
        participant: Participant,
        available_spots: i32,
    },
    Waitlisted {
        entry: WaitlistEntry,
        position: i32,
        available_spots: i32,
    },
}

impl JoinOutcome {
    pub fn available_spots(&self) -> i32 {
        match self {
            JoinOutcome::Confirmed {
                available_spots, ..
            }
            | JoinOutcome::Waitlisted {
                available_spots, ..
            } => *available_spots,
        }
    }
}

/// A waitlist entry converted into a participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Promotion {
    pub participant: Participant,
    pub waitlist_entry_id: Uuid,
    pub from_position: i32,
    /// Earlier entries found expired and skipped on the way.
    pub expired_entries: Vec<Uuid>,
}

/// What a leaving user was removed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "left", rename_all = "snake_case")]
pub enum Departure {
    Participant { participant: Participant },
    Waitlist { entry: WaitlistEntry },
}

/// Result of a leave.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LeaveOutcome {
    pub departure: Departure,
    pub available_spots: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted: Option<Promotion>,
}

/// Read-only view of a group booking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupBookingDetails {
    pub booking: Booking,
    pub participants: Vec<Participant>,
    pub waitlist: Vec<WaitlistEntry>,
    pub invitations: Vec<Invitation>,
}

impl From<GroupBookingState> for GroupBookingDetails {
    fn from(state: GroupBookingState) -> Self {
        let mut participants: Vec<Participant> = state
            .participants
            .into_iter()
            .filter(|p| p.status.is_active())
            .collect();
        participants.sort_by_key(|p| p.registered_at);

        let mut waitlist = state.waitlist;
        waitlist.sort_by_key(|e| e.position);

        let mut invitations = state.invitations;
        invitations.sort_by_key(|i| i.created_at);

        Self {
            booking: state.booking,
            participants,
            waitlist,
            invitations,
        }
    }
}

/// Rows moved to `expired` by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirySweep {
    pub invitations: u64,
    pub waitlist_entries: u64,
}
