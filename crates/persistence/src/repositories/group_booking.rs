//! Participant, waitlist and invitation repository.

use chrono::{DateTime, Utc};
use domain::models::{Invitation, Participant, WaitlistEntry};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{
    InvitationEntity, InvitationStatusDb, ParticipantEntity, ParticipantStatusDb,
    WaitlistEntryEntity, WaitlistStatusDb,
};
use crate::metrics::QueryTimer;

const PARTICIPANT_COLUMNS: &str = "id, booking_id, user_id, display_name, email, phone, status, \
     role, notes, registered_at, confirmed_at, cancelled_at, metadata";

const WAITLIST_COLUMNS: &str = "id, booking_id, user_id, name, email, phone, position, status, \
     created_at, notified_at, expires_at, converted_at, metadata";

const INVITATION_COLUMNS: &str = "id, booking_id, inviter_user_id, invitee_email, invitee_name, \
     invitee_user_id, token_hash, status, message, expires_at, responded_at, created_at";

/// Repository for the rows hanging off a group booking.
#[derive(Clone)]
pub struct GroupBookingRepository {
    pool: PgPool,
}

impl GroupBookingRepository {
    /// Creates a new GroupBookingRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// All participants of a booking, oldest first.
    pub async fn participants_for(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
    ) -> Result<Vec<ParticipantEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_group_participants");
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM group_booking_participants \
             WHERE booking_id = $1 ORDER BY registered_at ASC"
        );
        let result = sqlx::query_as::<_, ParticipantEntity>(&query)
            .bind(booking_id)
            .fetch_all(conn)
            .await;
        timer.record();
        result
    }

    /// The whole waitlist of a booking in queue order.
    pub async fn waitlist_for(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
    ) -> Result<Vec<WaitlistEntryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_booking_waitlist");
        let query = format!(
            "SELECT {WAITLIST_COLUMNS} FROM booking_waitlist \
             WHERE booking_id = $1 ORDER BY position ASC"
        );
        let result = sqlx::query_as::<_, WaitlistEntryEntity>(&query)
            .bind(booking_id)
            .fetch_all(conn)
            .await;
        timer.record();
        result
    }

    pub async fn invitations_for(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
    ) -> Result<Vec<InvitationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_group_invitations");
        let query = format!(
            "SELECT {INVITATION_COLUMNS} FROM group_booking_invitations \
             WHERE booking_id = $1 ORDER BY created_at ASC"
        );
        let result = sqlx::query_as::<_, InvitationEntity>(&query)
            .bind(booking_id)
            .fetch_all(conn)
            .await;
        timer.record();
        result
    }

    pub async fn insert_participant(
        &self,
        conn: &mut PgConnection,
        participant: &Participant,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_group_participant");
        let result = sqlx::query(
            r#"
            INSERT INTO group_booking_participants (
                id, booking_id, user_id, display_name, email, phone, status, role, notes,
                registered_at, confirmed_at, cancelled_at, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(participant.id)
        .bind(participant.booking_id)
        .bind(&participant.user_id)
        .bind(participant.display_name.as_deref())
        .bind(participant.email.as_deref())
        .bind(participant.phone.as_deref())
        .bind(ParticipantStatusDb::from(participant.status))
        .bind(&participant.role)
        .bind(participant.notes.as_deref())
        .bind(participant.registered_at)
        .bind(participant.confirmed_at)
        .bind(participant.cancelled_at)
        .bind(&participant.metadata)
        .execute(conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Cancel an active participant. Returns false when nothing matched.
    pub async fn cancel_participant(
        &self,
        conn: &mut PgConnection,
        participant_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("cancel_group_participant");
        let result = sqlx::query(
            r#"
            UPDATE group_booking_participants
            SET status = 'cancelled', cancelled_at = $2
            WHERE id = $1 AND status <> 'cancelled'
            "#,
        )
        .bind(participant_id)
        .bind(at)
        .execute(conn)
        .await;
        timer.record();
        Ok(result?.rows_affected() == 1)
    }

    pub async fn insert_waitlist_entry(
        &self,
        conn: &mut PgConnection,
        entry: &WaitlistEntry,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_waitlist_entry");
        let result = sqlx::query(
            r#"
            INSERT INTO booking_waitlist (
                id, booking_id, user_id, name, email, phone, position, status,
                created_at, notified_at, expires_at, converted_at, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(entry.id)
        .bind(entry.booking_id)
        .bind(&entry.user_id)
        .bind(entry.name.as_deref())
        .bind(entry.email.as_deref())
        .bind(entry.phone.as_deref())
        .bind(entry.position)
        .bind(WaitlistStatusDb::from(entry.status))
        .bind(entry.created_at)
        .bind(entry.notified_at)
        .bind(entry.expires_at)
        .bind(entry.converted_at)
        .bind(&entry.metadata)
        .execute(conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Set a waitlist entry's status, stamping `notified_at` or
    /// `converted_at` when the status calls for it.
    pub async fn update_waitlist_status(
        &self,
        conn: &mut PgConnection,
        entry_id: Uuid,
        status: WaitlistStatusDb,
        at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("update_waitlist_status");
        let result = sqlx::query(
            r#"
            UPDATE booking_waitlist
            SET status = $2,
                notified_at = CASE WHEN $2 = 'notified'::waitlist_status THEN $3 ELSE notified_at END,
                converted_at = CASE WHEN $2 = 'converted'::waitlist_status THEN $3 ELSE converted_at END
            WHERE id = $1
            "#,
        )
        .bind(entry_id)
        .bind(status)
        .bind(at)
        .execute(conn)
        .await;
        timer.record();
        Ok(result?.rows_affected() == 1)
    }

    pub async fn insert_invitation(
        &self,
        conn: &mut PgConnection,
        invitation: &Invitation,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_group_invitation");
        let result = sqlx::query(
            r#"
            INSERT INTO group_booking_invitations (
                id, booking_id, inviter_user_id, invitee_email, invitee_name, invitee_user_id,
                token_hash, status, message, expires_at, responded_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(invitation.id)
        .bind(invitation.booking_id)
        .bind(&invitation.inviter_user_id)
        .bind(&invitation.invitee_email)
        .bind(invitation.invitee_name.as_deref())
        .bind(invitation.invitee_user_id.as_deref())
        .bind(&invitation.token_hash)
        .bind(InvitationStatusDb::from(invitation.status))
        .bind(invitation.message.as_deref())
        .bind(invitation.expires_at)
        .bind(invitation.responded_at)
        .bind(invitation.created_at)
        .execute(conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Record the outcome of an invitation. Expiry leaves `responded_at`
    /// untouched.
    pub async fn resolve_invitation(
        &self,
        conn: &mut PgConnection,
        invitation_id: Uuid,
        status: InvitationStatusDb,
        at: DateTime<Utc>,
        invitee_user_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("resolve_group_invitation");
        let result = sqlx::query(
            r#"
            UPDATE group_booking_invitations
            SET status = $2,
                responded_at = CASE WHEN $2 = 'expired'::invitation_status THEN responded_at ELSE $3 END,
                invitee_user_id = COALESCE($4, invitee_user_id)
            WHERE id = $1
            "#,
        )
        .bind(invitation_id)
        .bind(status)
        .bind(at)
        .bind(invitee_user_id)
        .execute(conn)
        .await;
        timer.record();
        Ok(result?.rows_affected() == 1)
    }

    pub async fn find_invitation_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<InvitationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_invitation_by_token_hash");
        let query = format!(
            "SELECT {INVITATION_COLUMNS} FROM group_booking_invitations WHERE token_hash = $1"
        );
        let result = sqlx::query_as::<_, InvitationEntity>(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }
}
