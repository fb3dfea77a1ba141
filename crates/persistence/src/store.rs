//! PostgreSQL-backed [`BookingStore`].
//!
//! Slot checks run under a transaction-scoped advisory lock keyed by the
//! resource, and the `bookings_no_overlap` exclusion constraint backs them
//! up. Group booking operations lock the booking row with `FOR UPDATE` for
//! the whole read-decide-write cycle.

use chrono::{DateTime, Utc};
use domain::models::{
    Booking, BookingFilter, BookingStatus, Change, Draft, ExpirySweep, GroupBookingState,
    Invitation, NewBooking, TimeRange, Transition,
};
use domain::services::{invitation, waitlist, BookingStore};
use domain::{BookingError, BookingResult};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::{BookingStatusDb, InvitationStatusDb, WaitlistStatusDb};
use crate::repositories::{BookingRepository, GroupBookingRepository};

/// Maps database failures onto booking errors.
pub fn map_db_error(err: sqlx::Error) -> BookingError {
    match &err {
        sqlx::Error::RowNotFound => BookingError::NotFound("Record not found".to_string()),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23P01") => BookingError::SlotTaken {
                conflicting_bookings: Vec::new(),
            },
            Some("23505") => BookingError::Conflict(
                match db.constraint() {
                    Some("idx_participants_active_user") => "User is already a participant",
                    Some("idx_waitlist_pending_user") => "User is already on the waitlist",
                    Some("idx_invitations_pending_email") => {
                        "An invitation is already pending for this email"
                    }
                    _ => "Record already exists",
                }
                .to_string(),
            ),
            Some("23514") => BookingError::InvariantViolation(db.message().to_string()),
            _ => BookingError::Backend(err.to_string()),
        },
        _ => BookingError::Backend(err.to_string()),
    }
}

/// [`BookingStore`] over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
    bookings: BookingRepository,
    groups: GroupBookingRepository,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            bookings: BookingRepository::new(pool.clone()),
            groups: GroupBookingRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_state(
        &self,
        conn: &mut PgConnection,
        booking: Booking,
    ) -> Result<GroupBookingState, sqlx::Error> {
        let participants = self
            .groups
            .participants_for(conn, booking.id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        let waitlist = self
            .groups
            .waitlist_for(conn, booking.id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        let invitations = self
            .groups
            .invitations_for(conn, booking.id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(GroupBookingState {
            booking,
            participants,
            waitlist,
            invitations,
        })
    }

    async fn ensure_slot_free(
        &self,
        conn: &mut PgConnection,
        resource_id: &str,
        range: &TimeRange,
        exclude: Option<Uuid>,
    ) -> BookingResult<()> {
        self.bookings
            .lock_resource(conn, resource_id)
            .await
            .map_err(map_db_error)?;
        let conflicts = self
            .bookings
            .find_confirmed_overlapping_in(conn, resource_id, range.start, range.end, exclude)
            .await
            .map_err(map_db_error)?;
        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(BookingError::SlotTaken {
                conflicting_bookings: conflicts.iter().map(|b| b.id).collect(),
            })
        }
    }

    async fn write_change(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
        change: &Change,
    ) -> BookingResult<()> {
        match change {
            Change::SpotReserved => {
                if !self
                    .bookings
                    .reserve_spot(conn, booking_id)
                    .await
                    .map_err(map_db_error)?
                {
                    return Err(BookingError::BookingFull);
                }
            }
            Change::SpotReleased => {
                if !self
                    .bookings
                    .release_spot(conn, booking_id)
                    .await
                    .map_err(map_db_error)?
                {
                    return Err(BookingError::InvariantViolation(
                        "no taken spot to release".to_string(),
                    ));
                }
            }
            Change::ParticipantAdded(participant) => {
                self.groups
                    .insert_participant(conn, participant)
                    .await
                    .map_err(map_db_error)?;
            }
            Change::ParticipantCancelled { participant_id, at } => {
                if !self
                    .groups
                    .cancel_participant(conn, *participant_id, *at)
                    .await
                    .map_err(map_db_error)?
                {
                    return Err(BookingError::NotFound("Participant not found".to_string()));
                }
            }
            Change::WaitlistAdded(entry) => {
                self.groups
                    .insert_waitlist_entry(conn, entry)
                    .await
                    .map_err(map_db_error)?;
            }
            Change::WaitlistStatusChanged {
                entry_id,
                status,
                at,
            } => {
                if !self
                    .groups
                    .update_waitlist_status(conn, *entry_id, WaitlistStatusDb::from(*status), *at)
                    .await
                    .map_err(map_db_error)?
                {
                    return Err(BookingError::NotFound(
                        "Waitlist entry not found".to_string(),
                    ));
                }
            }
            Change::InvitationAdded(invitation) => {
                self.groups
                    .insert_invitation(conn, invitation)
                    .await
                    .map_err(map_db_error)?;
            }
            Change::InvitationResolved {
                invitation_id,
                status,
                at,
                invitee_user_id,
            } => {
                if !self
                    .groups
                    .resolve_invitation(
                        conn,
                        *invitation_id,
                        InvitationStatusDb::from(*status),
                        *at,
                        invitee_user_id.as_deref(),
                    )
                    .await
                    .map_err(map_db_error)?
                {
                    return Err(BookingError::NotFound("Invitation not found".to_string()));
                }
            }
        }
        Ok(())
    }
}

fn sweep_draft(draft: &mut Draft, now: DateTime<Utc>) -> BookingResult<ExpirySweep> {
    Ok(ExpirySweep {
        invitations: invitation::expire_stale(draft, now)?,
        waitlist_entries: waitlist::expire_stale(draft, now)?,
    })
}

#[async_trait::async_trait]
impl BookingStore for PgBookingStore {
    async fn list_bookings(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        let entities = self.bookings.list(filter).await.map_err(map_db_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn find_booking(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        let entity = self.bookings.find_by_id(id).await.map_err(map_db_error)?;
        Ok(entity.map(Into::into))
    }

    async fn confirmed_bookings_overlapping(
        &self,
        resource_id: &str,
        range: &TimeRange,
    ) -> BookingResult<Vec<Booking>> {
        let entities = self
            .bookings
            .find_confirmed_overlapping(resource_id, range.start, range.end)
            .await
            .map_err(map_db_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn insert_booking(&self, new_booking: NewBooking) -> BookingResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        if new_booking.status.blocks_slot() {
            self.ensure_slot_free(&mut *tx, &new_booking.resource_id, &new_booking.range, None)
                .await?;
        }

        let entity = self
            .bookings
            .insert(&mut *tx, &new_booking)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(entity.into())
    }

    async fn transition_status(&self, id: Uuid, to: BookingStatus) -> BookingResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let current: Booking = self
            .bookings
            .find_for_update(&mut *tx, id)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| BookingError::NotFound("Booking not found".to_string()))?
            .into();

        if !current.status.can_transition_to(to) {
            return Err(BookingError::InvalidTransition {
                from: current.status,
                to,
            });
        }
        if to.blocks_slot() {
            self.ensure_slot_free(&mut *tx, &current.resource_id, &current.time_range(), Some(id))
                .await?;
        }

        let entity = self
            .bookings
            .update_status(&mut *tx, id, BookingStatusDb::from(to))
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(entity.into())
    }

    async fn load_group(&self, booking_id: Uuid) -> BookingResult<Option<GroupBookingState>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let Some(entity) = self
            .bookings
            .find_for_share(&mut *tx, booking_id)
            .await
            .map_err(map_db_error)?
        else {
            return Ok(None);
        };
        let state = self
            .load_state(&mut *tx, entity.into())
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(Some(state))
    }

    async fn find_invitation_by_token_hash(
        &self,
        token_hash: &str,
    ) -> BookingResult<Option<Invitation>> {
        let entity = self
            .groups
            .find_invitation_by_token_hash(token_hash)
            .await
            .map_err(map_db_error)?;
        Ok(entity.map(Into::into))
    }

    async fn transact<T, F>(&self, booking_id: Uuid, operation: F) -> BookingResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Draft) -> Transition<T> + Send + 'static,
    {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let booking: Booking = self
            .bookings
            .find_for_update(&mut *tx, booking_id)
            .await
            .map_err(map_db_error)?
            .ok_or_else(BookingError::group_booking_not_found)?
            .into();
        let state = self
            .load_state(&mut *tx, booking)
            .await
            .map_err(map_db_error)?;

        let Transition { changes, result } = operation(Draft::new(state.clone()));

        if !changes.is_empty() {
            let mut next = state;
            for change in &changes {
                next.apply(change)?;
            }
            next.verify()?;

            for change in &changes {
                self.write_change(&mut *tx, booking_id, change).await?;
            }
            self.bookings
                .touch(&mut *tx, booking_id)
                .await
                .map_err(map_db_error)?;
            tx.commit().await.map_err(map_db_error)?;

            debug!(booking_id = %booking_id, changes = changes.len(), "Group booking changes persisted");
        }

        result
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> BookingResult<ExpirySweep> {
        let booking_ids = self
            .bookings
            .find_with_stale_items(now)
            .await
            .map_err(map_db_error)?;

        let mut sweep = ExpirySweep::default();
        for booking_id in booking_ids {
            let swept = self
                .transact(booking_id, move |mut draft| {
                    let result = sweep_draft(&mut draft, now);
                    draft.finish(result)
                })
                .await;

            match swept {
                Ok(counts) => {
                    sweep.invitations += counts.invitations;
                    sweep.waitlist_entries += counts.waitlist_entries;
                }
                Err(e) => {
                    warn!(booking_id = %booking_id, error = %e, "Failed to expire stale items");
                }
            }
        }

        Ok(sweep)
    }
}
