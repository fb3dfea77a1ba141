//! Group booking orchestration.
//!
//! Each mutating operation runs as one [`BookingStore::transact`] unit: the
//! store hands over the current state, the pure capacity, waitlist and
//! invitation logic records changes, and the store persists them together.
//! Notifications go out after the write and never fail the operation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::capacity::{self, CapacityLedger, JoinPath};
use super::invitation::{self, NewInvitation, DEFAULT_INVITATION_TTL_HOURS};
use super::notification::{BookingNotifier, NotificationResult};
use super::store::BookingStore;
use super::waitlist;
use crate::error::{BookingError, BookingResult};
use crate::models::{
    Booking, CreateGroupBookingRequest, ExpirySweep, GroupBookingDetails, InvitationDecision,
    InvitationReceipt, InvitationResponse, JoinOutcome, LeaveOutcome, NewParticipant, Promotion,
    SendInvitationRequest, TimeRange,
};

/// Default upper bound for group booking capacity.
pub const DEFAULT_MAX_GROUP_CAPACITY: i32 = 500;

/// Tunables for group bookings.
#[derive(Debug, Clone, Copy)]
pub struct GroupBookingSettings {
    pub invitation_ttl: Duration,
    pub max_capacity: i32,
}

impl Default for GroupBookingSettings {
    fn default() -> Self {
        Self {
            invitation_ttl: Duration::hours(DEFAULT_INVITATION_TTL_HOURS),
            max_capacity: DEFAULT_MAX_GROUP_CAPACITY,
        }
    }
}

/// Group booking operations over a [`BookingStore`].
pub struct GroupBookingService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    settings: GroupBookingSettings,
    clock: fn() -> DateTime<Utc>,
}

impl<S, N> Clone for GroupBookingService<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            settings: self.settings,
            clock: self.clock,
        }
    }
}

impl<S: BookingStore, N: BookingNotifier> GroupBookingService<S, N> {
    pub fn new(store: Arc<S>, notifier: Arc<N>, settings: GroupBookingSettings) -> Self {
        Self {
            store,
            notifier,
            settings,
            clock: Utc::now,
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Creates a pending group booking with an empty ledger.
    ///
    /// The slot is not checked here; it is checked when the booking is
    /// confirmed.
    pub async fn create_group_booking(
        &self,
        request: CreateGroupBookingRequest,
        organizer_id: String,
    ) -> BookingResult<Booking> {
        TimeRange::new(request.start_time, request.end_time)?;
        CapacityLedger::new(request.capacity)?;
        if request.capacity > self.settings.max_capacity {
            return Err(BookingError::Validation(format!(
                "capacity must be at most {}",
                self.settings.max_capacity
            )));
        }

        let booking = self
            .store
            .insert_booking(request.into_new_booking(organizer_id))
            .await
            .map_err(|e| log_failure("create_group_booking", e))?;

        info!(
            booking_id = %booking.id,
            capacity = booking.capacity,
            organizer_id = ?booking.group_organizer_id,
            "Group booking created"
        );
        Ok(booking)
    }

    /// Booking, active participants, waitlist and invitations.
    ///
    /// Invitations are only listed for the organizer.
    pub async fn get_details(
        &self,
        booking_id: Uuid,
        viewer_id: &str,
    ) -> BookingResult<GroupBookingDetails> {
        let state = self
            .store
            .load_group(booking_id)
            .await
            .map_err(|e| log_failure("get_details", e))?
            .filter(|s| s.booking.is_group_booking)
            .ok_or_else(BookingError::group_booking_not_found)?;

        let is_organizer = state.booking.is_organized_by(viewer_id);
        let mut details = GroupBookingDetails::from(state);
        if !is_organizer {
            details.invitations.clear();
        }
        Ok(details)
    }

    /// Joins a public or private group booking.
    pub async fn add_participant(
        &self,
        booking_id: Uuid,
        participant: NewParticipant,
    ) -> BookingResult<JoinOutcome> {
        let now = self.now();
        let (outcome, booking) = self
            .store
            .transact(booking_id, move |mut draft| {
                let result = capacity::join(&mut draft, participant, JoinPath::Direct, now)
                    .map(|outcome| (outcome, draft.state().booking.clone()));
                draft.finish(result)
            })
            .await
            .map_err(|e| log_failure("add_participant", e))?;

        info!(
            booking_id = %booking_id,
            status = join_status(&outcome),
            available_spots = outcome.available_spots(),
            "Participant joined group booking"
        );

        if let JoinOutcome::Confirmed { participant, .. } = &outcome {
            report(
                "participant_confirmed",
                self.notifier.participant_confirmed(&booking, participant).await,
            );
        }
        Ok(outcome)
    }

    /// Removes `user_id`. Callers may remove themselves; the organizer may
    /// remove anyone.
    pub async fn remove_participant(
        &self,
        booking_id: Uuid,
        user_id: String,
        actor_id: String,
    ) -> BookingResult<LeaveOutcome> {
        let now = self.now();
        let (outcome, booking) = self
            .store
            .transact(booking_id, move |mut draft| {
                let result = if actor_id != user_id
                    && !draft.state().booking.is_organized_by(&actor_id)
                {
                    Err(BookingError::Forbidden(
                        "Only the organizer can remove other participants".to_string(),
                    ))
                } else {
                    capacity::leave(&mut draft, &user_id, now)
                        .map(|outcome| (outcome, draft.state().booking.clone()))
                };
                draft.finish(result)
            })
            .await
            .map_err(|e| log_failure("remove_participant", e))?;

        info!(
            booking_id = %booking_id,
            available_spots = outcome.available_spots,
            promoted = outcome.promoted.is_some(),
            "Participant left group booking"
        );

        if let Some(promotion) = &outcome.promoted {
            self.announce_promotion(&booking, promotion).await;
        }
        Ok(outcome)
    }

    /// Promotes a specific waitlist entry. Organizer only.
    pub async fn promote_waitlist_participant(
        &self,
        booking_id: Uuid,
        waitlist_id: Uuid,
        actor_id: String,
    ) -> BookingResult<Promotion> {
        let now = self.now();
        let (promotion, booking) = self
            .store
            .transact(booking_id, move |mut draft| {
                let result = if !draft.state().booking.is_organized_by(&actor_id) {
                    Err(BookingError::Forbidden(
                        "Only the organizer can promote waitlist entries".to_string(),
                    ))
                } else {
                    waitlist::promote(&mut draft, waitlist_id, now)
                        .map(|promotion| (promotion, draft.state().booking.clone()))
                };
                draft.finish(result)
            })
            .await
            .map_err(|e| log_failure("promote_waitlist_participant", e))?;

        info!(
            booking_id = %booking_id,
            waitlist_id = %promotion.waitlist_entry_id,
            position = promotion.from_position,
            skipped_expired = promotion.expired_entries.len(),
            "Waitlist entry promoted"
        );

        self.announce_promotion(&booking, &promotion).await;
        Ok(promotion)
    }

    /// Invites someone by email and returns the one-time token.
    pub async fn send_invitation(
        &self,
        booking_id: Uuid,
        inviter_id: String,
        request: SendInvitationRequest,
    ) -> BookingResult<InvitationReceipt> {
        let now = self.now();
        let ttl = self.settings.invitation_ttl;
        let token = shared::crypto::generate_invitation_token();
        let new_invitation = NewInvitation {
            inviter_user_id: inviter_id,
            invitee_email: request.invitee_email,
            invitee_name: request.invitee_name,
            message: request.message,
            token_hash: shared::crypto::sha256_hex(&token),
        };

        let (invitation, booking) = self
            .store
            .transact(booking_id, move |mut draft| {
                let result = invitation::send(&mut draft, new_invitation, ttl, now)
                    .map(|invitation| (invitation, draft.state().booking.clone()));
                draft.finish(result)
            })
            .await
            .map_err(|e| log_failure("send_invitation", e))?;

        info!(
            booking_id = %booking_id,
            invitation_id = %invitation.id,
            expires_at = %invitation.expires_at,
            "Invitation sent"
        );

        report(
            "invitation_sent",
            self.notifier
                .invitation_sent(&booking, &invitation, &token)
                .await,
        );

        Ok(InvitationReceipt { invitation, token })
    }

    /// Redeems an invitation token.
    ///
    /// `responder` carries the authenticated identity; it is required to
    /// accept.
    pub async fn respond_to_invitation(
        &self,
        token: &str,
        decision: InvitationDecision,
        responder: Option<NewParticipant>,
    ) -> BookingResult<InvitationResponse> {
        if !shared::crypto::looks_like_invitation_token(token) {
            return Err(invitation::invitation_not_found());
        }

        let token_hash = shared::crypto::sha256_hex(token);
        let found = self
            .store
            .find_invitation_by_token_hash(&token_hash)
            .await
            .map_err(|e| log_failure("respond_to_invitation", e))?
            .ok_or_else(invitation::invitation_not_found)?;

        let now = self.now();
        let invitation_id = found.id;
        let (response, booking) = self
            .store
            .transact(found.booking_id, move |mut draft| {
                let result = invitation::respond(&mut draft, invitation_id, decision, responder, now)
                    .map(|response| (response, draft.state().booking.clone()));
                draft.finish(result)
            })
            .await
            .map_err(|e| log_failure("respond_to_invitation", e))?;

        info!(
            booking_id = %booking.id,
            invitation_id = %invitation_id,
            status = %response.invitation.status,
            "Invitation answered"
        );

        if let Some(participant) = response.participant() {
            report(
                "participant_confirmed",
                self.notifier.participant_confirmed(&booking, participant).await,
            );
        }
        Ok(response)
    }

    /// Expires stale invitations and waitlist entries.
    pub async fn expire_stale(&self) -> BookingResult<ExpirySweep> {
        self.store
            .expire_stale(self.now())
            .await
            .map_err(|e| log_failure("expire_stale", e))
    }

    async fn announce_promotion(&self, booking: &Booking, promotion: &Promotion) {
        report(
            "waitlist_promoted",
            self.notifier.waitlist_promoted(booking, promotion).await,
        );
    }
}

fn join_status(outcome: &JoinOutcome) -> &'static str {
    match outcome {
        JoinOutcome::Confirmed { .. } => "confirmed",
        JoinOutcome::Waitlisted { .. } => "waitlisted",
    }
}

fn report(notification: &str, result: NotificationResult) {
    if let NotificationResult::Failed(reason) = result {
        warn!(notification = notification, error = %reason, "Failed to send notification");
    }
}

fn log_failure(operation: &str, err: BookingError) -> BookingError {
    match &err {
        BookingError::Backend(_) | BookingError::InvariantViolation(_) => {
            error!(operation = operation, error = %err, "Group booking operation failed");
        }
        _ => {
            debug!(operation = operation, error = %err, "Group booking operation rejected");
        }
    }
    err
}
