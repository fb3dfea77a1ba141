//! Group booking invitation models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::participant::Participant;
use super::JoinOutcome;

/// Invitation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationStatus::Pending => write!(f, "pending"),
            InvitationStatus::Accepted => write!(f, "accepted"),
            InvitationStatus::Declined => write!(f, "declined"),
            InvitationStatus::Expired => write!(f, "expired"),
        }
    }
}

/// An invitation to join a group booking.
///
/// Only the SHA-256 of the token is stored; the raw token is handed out once
/// when the invitation is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Invitation {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub inviter_user_id: String,
    pub invitee_email: String,
    pub invitee_name: Option<String>,
    pub invitee_user_id: Option<String>,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub status: InvitationStatus,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// Pending and past its deadline. The deadline itself is still valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Request to invite someone to a group booking.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SendInvitationRequest {
    #[validate(email(message = "Invalid email format"))]
    pub invitee_email: String,

    #[validate(length(min = 1, max = 200, message = "invitee_name must be 1-200 characters"))]
    pub invitee_name: Option<String>,

    #[validate(length(max = 1000, message = "message must be at most 1000 characters"))]
    pub message: Option<String>,
}

/// Decision on an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationDecision {
    #[serde(alias = "accept")]
    Accepted,
    #[serde(alias = "decline")]
    Declined,
}

/// Request to accept or decline an invitation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RespondInvitationRequest {
    #[validate(length(min = 1, max = 128, message = "token is required"))]
    pub token: String,

    pub response: InvitationDecision,
}

/// A freshly sent invitation and its raw token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InvitationReceipt {
    pub invitation: Invitation,
    pub token: String,
}

/// Result of responding to an invitation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InvitationResponse {
    pub invitation: Invitation,
    /// Present when the invitation was accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JoinOutcome>,
}

impl InvitationResponse {
    /// The participant created by an accepted invitation, if confirmed.
    pub fn participant(&self) -> Option<&Participant> {
        match &self.outcome {
            Some(JoinOutcome::Confirmed { participant, .. }) => Some(participant),
            _ => None,
        }
    }
}
