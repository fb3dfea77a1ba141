//! Group booking participant models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Participant status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Registered,
    Confirmed,
    Cancelled,
    Waitlisted,
    NoShow,
}

impl ParticipantStatus {
    /// Whether the participant still counts as a member of the booking.
    pub fn is_active(self) -> bool {
        self != ParticipantStatus::Cancelled
    }

    /// Whether the participant occupies one unit of capacity.
    pub fn holds_spot(self) -> bool {
        matches!(
            self,
            ParticipantStatus::Registered | ParticipantStatus::Confirmed
        )
    }
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantStatus::Registered => write!(f, "registered"),
            ParticipantStatus::Confirmed => write!(f, "confirmed"),
            ParticipantStatus::Cancelled => write!(f, "cancelled"),
            ParticipantStatus::Waitlisted => write!(f, "waitlisted"),
            ParticipantStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// A person attached to a group booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Participant {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: ParticipantStatus,
    pub role: String,
    pub notes: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

/// Default participant role.
pub const ROLE_PARTICIPANT: &str = "participant";

/// Join request data gathered from the caller.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub notes: Option<String>,
    pub metadata: serde_json::Value,
}

impl NewParticipant {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            email: None,
            phone: None,
            role: ROLE_PARTICIPANT.to_string(),
            notes: None,
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Request body for joining a group booking.
///
/// The user id always comes from the authenticated session; the body only
/// carries optional details.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct JoinGroupBookingRequest {
    #[validate(length(min = 1, max = 200, message = "display_name must be 1-200 characters"))]
    pub display_name: Option<String>,

    #[validate(length(max = 32, message = "phone must be at most 32 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 50, message = "role must be at most 50 characters"))]
    pub role: Option<String>,

    #[validate(length(max = 500, message = "notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

impl JoinGroupBookingRequest {
    /// Combines the body with the session identity.
    pub fn into_new_participant(self, user_id: String, email: Option<String>) -> NewParticipant {
        NewParticipant {
            user_id,
            display_name: self.display_name,
            email,
            phone: self.phone,
            role: self.role.unwrap_or_else(|| ROLE_PARTICIPANT.to_string()),
            notes: self.notes,
            metadata: serde_json::json!({}),
        }
    }
}
