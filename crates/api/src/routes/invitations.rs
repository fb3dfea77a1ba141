//! Invitation redemption.

use axum::{extract::State, Json};
use domain::models::{
    InvitationDecision, InvitationResponse, NewParticipant, RespondInvitationRequest,
};
use validator::Validate;

use super::{ok, ApiResponse};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{OptionalUserAuth, UserAuth};
use crate::middleware::metrics::record_group_join;

/// Accept or decline an invitation by token.
///
/// POST /api/invitations/respond
///
/// Declining works without a session; accepting joins the booking as the
/// signed-in caller.
pub async fn respond_to_invitation(
    State(state): State<AppState>,
    OptionalUserAuth(user_auth): OptionalUserAuth,
    Json(request): Json<RespondInvitationRequest>,
) -> Result<Json<ApiResponse<InvitationResponse>>, ApiError> {
    request.validate()?;

    if request.response == InvitationDecision::Accepted && user_auth.is_none() {
        return Err(ApiError::Unauthorized(
            "Sign in to accept this invitation".to_string(),
        ));
    }

    let responder = user_auth.map(responder_from);
    let response = state
        .group_bookings
        .respond_to_invitation(&request.token, request.response, responder)
        .await?;
    if let Some(outcome) = &response.outcome {
        record_group_join(outcome);
    }

    Ok(ok(response))
}

fn responder_from(user_auth: UserAuth) -> NewParticipant {
    NewParticipant::new(user_auth.user_id).with_email(user_auth.email)
}
