//! Invitation workflow.
//!
//! `pending -> accepted | declined | expired`, all terminal. A token can be
//! redeemed once, while pending and not past `expires_at`.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::capacity::{self, JoinPath};
use crate::error::{BookingError, BookingResult};
use crate::models::{
    Change, Draft, Invitation, InvitationDecision, InvitationResponse, InvitationStatus,
    NewParticipant,
};

/// Invitations are valid for a week unless configured otherwise.
pub const DEFAULT_INVITATION_TTL_HOURS: i64 = 168;

/// Data for a new invitation. The token is generated and hashed by the caller.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub inviter_user_id: String,
    pub invitee_email: String,
    pub invitee_name: Option<String>,
    pub message: Option<String>,
    pub token_hash: String,
}

/// Creates a pending invitation expiring `ttl` after `now`.
pub fn send(
    draft: &mut Draft,
    new_invitation: NewInvitation,
    ttl: Duration,
    now: DateTime<Utc>,
) -> BookingResult<Invitation> {
    let state = draft.state();
    let booking = &state.booking;

    if !booking.is_group_booking {
        return Err(BookingError::group_booking_not_found());
    }
    if !booking.status.is_open() {
        return Err(BookingError::Conflict(format!(
            "Cannot invite to a {} booking",
            booking.status
        )));
    }
    if let Some(organizer) = booking.group_organizer_id.as_deref() {
        if organizer != new_invitation.inviter_user_id {
            return Err(BookingError::Forbidden(
                "Only the organizer can send invitations".to_string(),
            ));
        }
    }

    let email = new_invitation.invitee_email.trim().to_lowercase();
    if state.pending_invitation_for(&email).is_some() {
        return Err(BookingError::Conflict(
            "An invitation is already pending for this email".to_string(),
        ));
    }
    let already_joined = state.participants.iter().any(|p| {
        p.status.is_active()
            && p.email
                .as_deref()
                .map_or(false, |e| e.eq_ignore_ascii_case(&email))
    });
    if already_joined {
        return Err(BookingError::Conflict(
            "Invitee is already a participant".to_string(),
        ));
    }

    let invitation = Invitation {
        id: Uuid::new_v4(),
        booking_id: booking.id,
        inviter_user_id: new_invitation.inviter_user_id,
        invitee_email: email,
        invitee_name: new_invitation.invitee_name,
        invitee_user_id: None,
        token_hash: new_invitation.token_hash,
        status: InvitationStatus::Pending,
        message: new_invitation.message,
        expires_at: now + ttl,
        responded_at: None,
        created_at: now,
    };

    draft.record(Change::InvitationAdded(invitation.clone()))?;
    Ok(invitation)
}

/// Accepts or declines an invitation.
///
/// Accepting runs the regular join path with the responder's identity. The
/// invitation is marked `accepted` only together with a successful join; if
/// the join fails nothing is recorded. An expired invitation is marked
/// `expired` and the call fails.
pub fn respond(
    draft: &mut Draft,
    invitation_id: Uuid,
    decision: InvitationDecision,
    responder: Option<NewParticipant>,
    now: DateTime<Utc>,
) -> BookingResult<InvitationResponse> {
    let invitation = draft
        .state()
        .invitation(invitation_id)
        .filter(|i| i.status == InvitationStatus::Pending)
        .cloned()
        .ok_or_else(invitation_not_found)?;

    if invitation.is_expired_at(now) {
        draft.record(Change::InvitationResolved {
            invitation_id,
            status: InvitationStatus::Expired,
            at: now,
            invitee_user_id: None,
        })?;
        return Err(BookingError::Expired("Invitation has expired".to_string()));
    }

    match decision {
        InvitationDecision::Declined => {
            let invitee_user_id = responder.map(|r| r.user_id);
            draft.record(Change::InvitationResolved {
                invitation_id,
                status: InvitationStatus::Declined,
                at: now,
                invitee_user_id,
            })?;
            Ok(InvitationResponse {
                invitation: resolved(draft, invitation_id)?,
                outcome: None,
            })
        }
        InvitationDecision::Accepted => {
            let mut responder = responder.ok_or_else(|| {
                BookingError::Forbidden("Sign in to accept this invitation".to_string())
            })?;
            if responder.email.is_none() {
                responder.email = Some(invitation.invitee_email.clone());
            }
            if responder.display_name.is_none() {
                responder.display_name = invitation.invitee_name.clone();
            }
            let user_id = responder.user_id.clone();

            let mut attempt = draft.clone();
            let outcome = capacity::join(&mut attempt, responder, JoinPath::Invitation, now)?;
            attempt.record(Change::InvitationResolved {
                invitation_id,
                status: InvitationStatus::Accepted,
                at: now,
                invitee_user_id: Some(user_id),
            })?;
            *draft = attempt;

            Ok(InvitationResponse {
                invitation: resolved(draft, invitation_id)?,
                outcome: Some(outcome),
            })
        }
    }
}

/// Marks every pending invitation past its deadline. Returns how many changed.
pub fn expire_stale(draft: &mut Draft, now: DateTime<Utc>) -> BookingResult<u64> {
    let stale: Vec<Uuid> = draft
        .state()
        .invitations
        .iter()
        .filter(|i| i.status == InvitationStatus::Pending && i.is_expired_at(now))
        .map(|i| i.id)
        .collect();

    for id in &stale {
        draft.record(Change::InvitationResolved {
            invitation_id: *id,
            status: InvitationStatus::Expired,
            at: now,
            invitee_user_id: None,
        })?;
    }
    Ok(stale.len() as u64)
}

pub fn invitation_not_found() -> BookingError {
    BookingError::NotFound("Invitation not found or already used".to_string())
}

fn resolved(draft: &Draft, invitation_id: Uuid) -> BookingResult<Invitation> {
    draft
        .state()
        .invitation(invitation_id)
        .cloned()
        .ok_or_else(invitation_not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BookingStatus, GroupBookingState, GroupBookingType, JoinOutcome, NewBooking,
        ParticipantStatus, TimeRange,
    };
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 9, 0, 0).unwrap()
    }

    fn ttl() -> Duration {
        Duration::hours(DEFAULT_INVITATION_TTL_HOURS)
    }

    fn invite_only(capacity: i32) -> Draft {
        let start = now() + Duration::days(21);
        let booking = NewBooking {
            organization_id: "org_1".to_string(),
            resource_id: "gallery".to_string(),
            resource_type: Some("gallery".to_string()),
            title: "Private view".to_string(),
            description: None,
            range: TimeRange::new(start, start + Duration::hours(2)).unwrap(),
            status: BookingStatus::Pending,
            capacity,
            price_cents: None,
            currency: None,
            location: None,
            is_group_booking: true,
            group_size: Some(capacity),
            waitlist_enabled: false,
            group_booking_type: Some(GroupBookingType::InviteOnly),
            group_organizer_id: Some("user_org".to_string()),
            artist_name: None,
            artist_email: None,
            goal_text: None,
            consent_recording: false,
            created_by: Some("user_org".to_string()),
        }
        .into_booking(Uuid::new_v4(), now());
        Draft::new(GroupBookingState::new(booking))
    }

    fn new_invitation(email: &str) -> NewInvitation {
        NewInvitation {
            inviter_user_id: "user_org".to_string(),
            invitee_email: email.to_string(),
            invitee_name: Some("Guest".to_string()),
            message: Some("Join us".to_string()),
            token_hash: shared::crypto::sha256_hex(email),
        }
    }

    #[test]
    fn test_send_creates_pending_invitation() {
        let mut draft = invite_only(4);
        let invitation =
            send(&mut draft, new_invitation("Guest@Example.com"), ttl(), now()).unwrap();

        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert_eq!(invitation.invitee_email, "guest@example.com");
        assert_eq!(invitation.expires_at, now() + Duration::days(7));
        assert_eq!(draft.state().invitations.len(), 1);
    }

    #[test]
    fn test_send_requires_organizer() {
        let mut draft = invite_only(4);
        let mut request = new_invitation("guest@example.com");
        request.inviter_user_id = "user_other".to_string();
        assert!(matches!(
            send(&mut draft, request, ttl(), now()),
            Err(BookingError::Forbidden(_))
        ));
    }

    #[test]
    fn test_send_duplicate_pending_rejected() {
        let mut draft = invite_only(4);
        send(&mut draft, new_invitation("guest@example.com"), ttl(), now()).unwrap();
        assert!(matches!(
            send(&mut draft, new_invitation("GUEST@example.com"), ttl(), now()),
            Err(BookingError::Conflict(_))
        ));
    }

    #[test]
    fn test_accept_joins_booking() {
        let mut draft = invite_only(4);
        let invitation =
            send(&mut draft, new_invitation("guest@example.com"), ttl(), now()).unwrap();

        let response = respond(
            &mut draft,
            invitation.id,
            InvitationDecision::Accepted,
            Some(NewParticipant::new("user_guest")),
            now() + Duration::hours(1),
        )
        .unwrap();

        assert_eq!(response.invitation.status, InvitationStatus::Accepted);
        assert_eq!(
            response.invitation.invitee_user_id.as_deref(),
            Some("user_guest")
        );
        let participant = response.participant().unwrap();
        assert_eq!(participant.status, ParticipantStatus::Confirmed);
        assert_eq!(participant.email.as_deref(), Some("guest@example.com"));
        assert_eq!(draft.state().booking.available_spots, 3);
    }

    #[test]
    fn test_token_is_single_use() {
        let mut draft = invite_only(4);
        let invitation =
            send(&mut draft, new_invitation("guest@example.com"), ttl(), now()).unwrap();
        respond(
            &mut draft,
            invitation.id,
            InvitationDecision::Declined,
            None,
            now(),
        )
        .unwrap();

        for decision in [InvitationDecision::Accepted, InvitationDecision::Declined] {
            assert_eq!(
                respond(
                    &mut draft,
                    invitation.id,
                    decision,
                    Some(NewParticipant::new("user_guest")),
                    now(),
                )
                .unwrap_err(),
                invitation_not_found()
            );
        }
    }

    #[test]
    fn test_expired_invitation_marked_expired() {
        let mut draft = invite_only(4);
        let invitation =
            send(&mut draft, new_invitation("guest@example.com"), ttl(), now()).unwrap();

        let late = invitation.expires_at + Duration::seconds(1);
        let result = respond(
            &mut draft,
            invitation.id,
            InvitationDecision::Accepted,
            Some(NewParticipant::new("user_guest")),
            late,
        );
        assert!(matches!(result, Err(BookingError::Expired(_))));
        assert_eq!(
            draft.state().invitation(invitation.id).unwrap().status,
            InvitationStatus::Expired
        );
        assert!(draft.state().participants.is_empty());
    }

    #[test]
    fn test_failed_join_leaves_invitation_pending() {
        let mut draft = invite_only(1);
        let first = send(&mut draft, new_invitation("a@example.com"), ttl(), now()).unwrap();
        let second = send(&mut draft, new_invitation("b@example.com"), ttl(), now()).unwrap();

        respond(
            &mut draft,
            first.id,
            InvitationDecision::Accepted,
            Some(NewParticipant::new("user_a")),
            now(),
        )
        .unwrap();

        let changes_before = draft.changes().len();
        let result = respond(
            &mut draft,
            second.id,
            InvitationDecision::Accepted,
            Some(NewParticipant::new("user_b")),
            now(),
        );
        assert_eq!(result.unwrap_err(), BookingError::BookingFull);
        assert_eq!(draft.changes().len(), changes_before);
        assert_eq!(
            draft.state().invitation(second.id).unwrap().status,
            InvitationStatus::Pending
        );
    }

    #[test]
    fn test_accept_requires_identity() {
        let mut draft = invite_only(2);
        let invitation =
            send(&mut draft, new_invitation("guest@example.com"), ttl(), now()).unwrap();
        assert!(matches!(
            respond(
                &mut draft,
                invitation.id,
                InvitationDecision::Accepted,
                None,
                now()
            ),
            Err(BookingError::Forbidden(_))
        ));
    }

    #[test]
    fn test_accept_into_waitlist_when_full() {
        let mut draft = invite_only(1);
        let mut state = draft.state().clone();
        state.booking.waitlist_enabled = true;
        let mut draft = Draft::new(state);

        let a = send(&mut draft, new_invitation("a@example.com"), ttl(), now()).unwrap();
        let b = send(&mut draft, new_invitation("b@example.com"), ttl(), now()).unwrap();
        respond(
            &mut draft,
            a.id,
            InvitationDecision::Accepted,
            Some(NewParticipant::new("user_a")),
            now(),
        )
        .unwrap();
        let response = respond(
            &mut draft,
            b.id,
            InvitationDecision::Accepted,
            Some(NewParticipant::new("user_b")),
            now(),
        )
        .unwrap();

        assert!(matches!(
            response.outcome,
            Some(JoinOutcome::Waitlisted { position: 1, .. })
        ));
    }

    #[test]
    fn test_expire_stale_invitations() {
        let mut draft = invite_only(2);
        send(&mut draft, new_invitation("a@example.com"), ttl(), now()).unwrap();
        assert_eq!(expire_stale(&mut draft, now()).unwrap(), 0);
        assert_eq!(
            expire_stale(&mut draft, now() + ttl() + Duration::minutes(1)).unwrap(),
            1
        );
    }
}
