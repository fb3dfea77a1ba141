//! Group booking routes.
//!
//! Capacity, waitlist and permission rules live in the domain service; these
//! handlers validate input, attach the caller's identity and map results.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    Booking, CreateGroupBookingRequest, GroupBookingDetails, InvitationReceipt,
    JoinGroupBookingRequest, JoinOutcome, LeaveOutcome, Promotion, SendInvitationRequest,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{created, ok, ApiResponse};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::{
    record_booking_created, record_group_join, record_invitation_sent, record_waitlist_promotion,
};

/// Create a group booking organized by the caller.
///
/// POST /api/group-bookings
///
/// The booking starts `pending`; its slot is checked when it is confirmed.
pub async fn create_group_booking(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<CreateGroupBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Booking>>), ApiError> {
    request.validate()?;

    let booking = state
        .group_bookings
        .create_group_booking(request, user_auth.user_id)
        .await?;
    record_booking_created(true);

    Ok(created(booking))
}

/// Booking details with participants and waitlist. Invitations are only
/// included for the organizer.
///
/// GET /api/group-bookings/:booking_id
pub async fn get_group_booking(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<ApiResponse<GroupBookingDetails>>, ApiError> {
    let details = state
        .group_bookings
        .get_details(booking_id, &user_auth.user_id)
        .await?;
    Ok(ok(details))
}

/// Join as the caller. A full booking with a waitlist queues the caller
/// instead.
///
/// POST /api/group-bookings/:booking_id/participants
///
/// The body is optional; an empty body joins with the session identity only.
pub async fn join_group_booking(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(booking_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ApiResponse<JoinOutcome>>, ApiError> {
    let request = parse_join_request(&body)?;
    request.validate()?;

    let participant = request.into_new_participant(user_auth.user_id, user_auth.email);
    let outcome = state
        .group_bookings
        .add_participant(booking_id, participant)
        .await?;
    record_group_join(&outcome);

    Ok(ok(outcome))
}

fn parse_join_request(body: &[u8]) -> Result<JoinGroupBookingRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JoinGroupBookingRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
}

/// Leave, or remove someone as the organizer.
///
/// DELETE /api/group-bookings/:booking_id/participants/:user_id
pub async fn leave_group_booking(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path((booking_id, user_id)): Path<(Uuid, String)>,
) -> Result<Json<ApiResponse<LeaveOutcome>>, ApiError> {
    let outcome = state
        .group_bookings
        .remove_participant(booking_id, user_id, user_auth.user_id)
        .await?;
    if outcome.promoted.is_some() {
        record_waitlist_promotion();
    }

    Ok(ok(outcome))
}

/// Promote a specific waitlist entry. Organizer only.
///
/// POST /api/group-bookings/:booking_id/waitlist/:waitlist_id/promote
pub async fn promote_waitlist_entry(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path((booking_id, waitlist_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Promotion>>, ApiError> {
    let promotion = state
        .group_bookings
        .promote_waitlist_participant(booking_id, waitlist_id, user_auth.user_id)
        .await?;
    record_waitlist_promotion();

    Ok(ok(promotion))
}

/// Invite someone by email. Organizer only.
///
/// POST /api/group-bookings/:booking_id/invitations
///
/// The raw token is returned once, here and in the invitation email.
pub async fn send_invitation(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<SendInvitationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InvitationReceipt>>), ApiError> {
    request.validate()?;

    let receipt = state
        .group_bookings
        .send_invitation(booking_id, user_auth.user_id.clone(), request)
        .await?;
    record_invitation_sent();

    info!(
        booking_id = %booking_id,
        invitation_id = %receipt.invitation.id,
        inviter_id = %user_auth.user_id,
        "Invitation created via API"
    );
    Ok(created(receipt))
}
