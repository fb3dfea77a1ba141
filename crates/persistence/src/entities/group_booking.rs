//! Group booking participant, waitlist and invitation entities.

use chrono::{DateTime, Utc};
use domain::models::{
    Invitation, InvitationStatus, Participant, ParticipantStatus, WaitlistEntry, WaitlistStatus,
};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for participant_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "participant_status", rename_all = "snake_case")]
pub enum ParticipantStatusDb {
    Registered,
    Confirmed,
    Cancelled,
    Waitlisted,
    NoShow,
}

impl From<ParticipantStatusDb> for ParticipantStatus {
    fn from(db: ParticipantStatusDb) -> Self {
        match db {
            ParticipantStatusDb::Registered => ParticipantStatus::Registered,
            ParticipantStatusDb::Confirmed => ParticipantStatus::Confirmed,
            ParticipantStatusDb::Cancelled => ParticipantStatus::Cancelled,
            ParticipantStatusDb::Waitlisted => ParticipantStatus::Waitlisted,
            ParticipantStatusDb::NoShow => ParticipantStatus::NoShow,
        }
    }
}

impl From<ParticipantStatus> for ParticipantStatusDb {
    fn from(status: ParticipantStatus) -> Self {
        match status {
            ParticipantStatus::Registered => ParticipantStatusDb::Registered,
            ParticipantStatus::Confirmed => ParticipantStatusDb::Confirmed,
            ParticipantStatus::Cancelled => ParticipantStatusDb::Cancelled,
            ParticipantStatus::Waitlisted => ParticipantStatusDb::Waitlisted,
            ParticipantStatus::NoShow => ParticipantStatusDb::NoShow,
        }
    }
}

/// Database enum for waitlist_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "waitlist_status", rename_all = "lowercase")]
pub enum WaitlistStatusDb {
    Waiting,
    Notified,
    Expired,
    Converted,
    Cancelled,
}

impl From<WaitlistStatusDb> for WaitlistStatus {
    fn from(db: WaitlistStatusDb) -> Self {
        match db {
            WaitlistStatusDb::Waiting => WaitlistStatus::Waiting,
            WaitlistStatusDb::Notified => WaitlistStatus::Notified,
            WaitlistStatusDb::Expired => WaitlistStatus::Expired,
            WaitlistStatusDb::Converted => WaitlistStatus::Converted,
            WaitlistStatusDb::Cancelled => WaitlistStatus::Cancelled,
        }
    }
}

impl From<WaitlistStatus> for WaitlistStatusDb {
    fn from(status: WaitlistStatus) -> Self {
        match status {
            WaitlistStatus::Waiting => WaitlistStatusDb::Waiting,
            WaitlistStatus::Notified => WaitlistStatusDb::Notified,
            WaitlistStatus::Expired => WaitlistStatusDb::Expired,
            WaitlistStatus::Converted => WaitlistStatusDb::Converted,
            WaitlistStatus::Cancelled => WaitlistStatusDb::Cancelled,
        }
    }
}

/// Database enum for invitation_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
pub enum InvitationStatusDb {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl From<InvitationStatusDb> for InvitationStatus {
    fn from(db: InvitationStatusDb) -> Self {
        match db {
            InvitationStatusDb::Pending => InvitationStatus::Pending,
            InvitationStatusDb::Accepted => InvitationStatus::Accepted,
            InvitationStatusDb::Declined => InvitationStatus::Declined,
            InvitationStatusDb::Expired => InvitationStatus::Expired,
        }
    }
}

impl From<InvitationStatus> for InvitationStatusDb {
    fn from(status: InvitationStatus) -> Self {
        match status {
            InvitationStatus::Pending => InvitationStatusDb::Pending,
            InvitationStatus::Accepted => InvitationStatusDb::Accepted,
            InvitationStatus::Declined => InvitationStatusDb::Declined,
            InvitationStatus::Expired => InvitationStatusDb::Expired,
        }
    }
}

/// Database row mapping for the group_booking_participants table.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantEntity {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: ParticipantStatusDb,
    pub role: String,
    pub notes: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

impl From<ParticipantEntity> for Participant {
    fn from(entity: ParticipantEntity) -> Self {
        Self {
            id: entity.id,
            booking_id: entity.booking_id,
            user_id: entity.user_id,
            display_name: entity.display_name,
            email: entity.email,
            phone: entity.phone,
            status: entity.status.into(),
            role: entity.role,
            notes: entity.notes,
            registered_at: entity.registered_at,
            confirmed_at: entity.confirmed_at,
            cancelled_at: entity.cancelled_at,
            metadata: entity.metadata,
        }
    }
}

/// Database row mapping for the booking_waitlist table.
#[derive(Debug, Clone, FromRow)]
pub struct WaitlistEntryEntity {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: i32,
    pub status: WaitlistStatusDb,
    pub created_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub converted_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

impl From<WaitlistEntryEntity> for WaitlistEntry {
    fn from(entity: WaitlistEntryEntity) -> Self {
        Self {
            id: entity.id,
            booking_id: entity.booking_id,
            user_id: entity.user_id,
            name: entity.name,
            email: entity.email,
            phone: entity.phone,
            position: entity.position,
            status: entity.status.into(),
            created_at: entity.created_at,
            notified_at: entity.notified_at,
            expires_at: entity.expires_at,
            converted_at: entity.converted_at,
            metadata: entity.metadata,
        }
    }
}

/// Database row mapping for the group_booking_invitations table.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationEntity {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub inviter_user_id: String,
    pub invitee_email: String,
    pub invitee_name: Option<String>,
    pub invitee_user_id: Option<String>,
    pub token_hash: String,
    pub status: InvitationStatusDb,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<InvitationEntity> for Invitation {
    fn from(entity: InvitationEntity) -> Self {
        Self {
            id: entity.id,
            booking_id: entity.booking_id,
            inviter_user_id: entity.inviter_user_id,
            invitee_email: entity.invitee_email,
            invitee_name: entity.invitee_name,
            invitee_user_id: entity.invitee_user_id,
            token_hash: entity.token_hash,
            status: entity.status.into(),
            message: entity.message,
            expires_at: entity.expires_at,
            responded_at: entity.responded_at,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_status_round_trip() {
        for status in [
            ParticipantStatus::Registered,
            ParticipantStatus::Confirmed,
            ParticipantStatus::Cancelled,
            ParticipantStatus::Waitlisted,
            ParticipantStatus::NoShow,
        ] {
            assert_eq!(
                ParticipantStatus::from(ParticipantStatusDb::from(status)),
                status
            );
        }
    }

    #[test]
    fn test_waitlist_entity_to_domain() {
        let now = Utc::now();
        let entity = WaitlistEntryEntity {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            user_id: "user_1".to_string(),
            name: Some("Sam".to_string()),
            email: None,
            phone: None,
            position: 4,
            status: WaitlistStatusDb::Notified,
            created_at: now,
            notified_at: Some(now),
            expires_at: None,
            converted_at: None,
            metadata: serde_json::json!({"role": "participant"}),
        };

        let entry: WaitlistEntry = entity.into();
        assert_eq!(entry.position, 4);
        assert_eq!(entry.status, WaitlistStatus::Notified);
        assert!(entry.is_active_at(now));
    }
}
