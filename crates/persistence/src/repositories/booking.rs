//! Booking repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::{BookingFilter, NewBooking};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{BookingEntity, BookingStatusDb, GroupBookingTypeDb, BOOKING_COLUMNS};
use crate::metrics::QueryTimer;

/// Repository for booking rows.
///
/// Reads go through the pool. Writes take a connection so callers can run
/// them inside their own transaction.
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Creates a new BookingRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// List bookings matching `filter`, ordered by start time.
    pub async fn list(&self, filter: &BookingFilter) -> Result<Vec<BookingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_bookings");
        let status = filter.status.map(BookingStatusDb::from);
        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE ($1::varchar IS NULL OR organization_id = $1)
              AND ($2::varchar IS NULL OR resource_id = $2)
              AND ($3::booking_status IS NULL OR status = $3)
              AND ($4::timestamptz IS NULL OR end_time > $4)
              AND ($5::timestamptz IS NULL OR start_time < $5)
            ORDER BY start_time ASC, created_at ASC
            LIMIT $6
            "#
        );
        let result = sqlx::query_as::<_, BookingEntity>(&query)
            .bind(filter.organization_id.as_deref())
            .bind(filter.resource_id.as_deref())
            .bind(status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Find a booking by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<BookingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_booking_by_id");
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let result = sqlx::query_as::<_, BookingEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Confirmed bookings of a resource overlapping `[start, end)`.
    pub async fn find_confirmed_overlapping(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BookingEntity>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        self.find_confirmed_overlapping_in(&mut conn, resource_id, start, end, None)
            .await
    }

    /// Same as [`find_confirmed_overlapping`](Self::find_confirmed_overlapping)
    /// on a caller-held connection, optionally ignoring one booking.
    pub async fn find_confirmed_overlapping_in(
        &self,
        conn: &mut PgConnection,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<BookingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_confirmed_overlapping");
        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE resource_id = $1
              AND status = 'confirmed'
              AND start_time < $3
              AND end_time > $2
              AND ($4::uuid IS NULL OR id <> $4)
            ORDER BY start_time ASC
            "#
        );
        let result = sqlx::query_as::<_, BookingEntity>(&query)
            .bind(resource_id)
            .bind(start)
            .bind(end)
            .bind(exclude)
            .fetch_all(conn)
            .await;
        timer.record();
        result
    }

    /// Serializes slot checks for one resource until the transaction ends.
    pub async fn lock_resource(
        &self,
        conn: &mut PgConnection,
        resource_id: &str,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("lock_booking_resource");
        let result = sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(resource_id)
            .execute(conn)
            .await;
        timer.record();
        result.map(|_| ())
    }

    /// Insert a booking with a fresh ID.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        booking: &NewBooking,
    ) -> Result<BookingEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_booking");
        let query = format!(
            r#"
            INSERT INTO bookings (
                id, organization_id, resource_id, resource_type, title, description,
                start_time, end_time, status, capacity, current_participants, available_spots,
                price_cents, currency, location, is_group_booking, group_size, waitlist_enabled,
                group_booking_type, group_organizer_id, artist_name, artist_email, goal_text,
                consent_recording, created_by
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, BookingEntity>(&query)
            .bind(Uuid::new_v4())
            .bind(&booking.organization_id)
            .bind(&booking.resource_id)
            .bind(booking.resource_type.as_deref())
            .bind(&booking.title)
            .bind(booking.description.as_deref())
            .bind(booking.range.start)
            .bind(booking.range.end)
            .bind(BookingStatusDb::from(booking.status))
            .bind(booking.capacity)
            .bind(booking.price_cents)
            .bind(booking.currency.as_deref())
            .bind(booking.location.as_deref())
            .bind(booking.is_group_booking)
            .bind(booking.group_size)
            .bind(booking.waitlist_enabled)
            .bind(booking.group_booking_type.map(GroupBookingTypeDb::from))
            .bind(booking.group_organizer_id.as_deref())
            .bind(booking.artist_name.as_deref())
            .bind(booking.artist_email.as_deref())
            .bind(booking.goal_text.as_deref())
            .bind(booking.consent_recording)
            .bind(booking.created_by.as_deref())
            .fetch_one(conn)
            .await;
        timer.record();
        result
    }

    /// Find a booking and lock its row until the transaction ends.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<BookingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_booking_for_update");
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE");
        let result = sqlx::query_as::<_, BookingEntity>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await;
        timer.record();
        result
    }

    /// Find a booking, blocking writers until the transaction ends.
    pub async fn find_for_share(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<BookingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_booking_for_share");
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR SHARE");
        let result = sqlx::query_as::<_, BookingEntity>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await;
        timer.record();
        result
    }

    pub async fn update_status(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: BookingStatusDb,
    ) -> Result<BookingEntity, sqlx::Error> {
        let timer = QueryTimer::new("update_booking_status");
        let query = format!(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, BookingEntity>(&query)
            .bind(id)
            .bind(status)
            .fetch_one(conn)
            .await;
        timer.record();
        result
    }

    /// Take one spot. Returns false when none is left.
    pub async fn reserve_spot(&self, conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("reserve_booking_spot");
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET available_spots = available_spots - 1,
                current_participants = current_participants + 1,
                updated_at = NOW()
            WHERE id = $1 AND available_spots > 0
            "#,
        )
        .bind(id)
        .execute(conn)
        .await;
        timer.record();
        Ok(result?.rows_affected() == 1)
    }

    /// Give back one spot. Returns false when no spot was taken.
    pub async fn release_spot(&self, conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("release_booking_spot");
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET available_spots = available_spots + 1,
                current_participants = current_participants - 1,
                updated_at = NOW()
            WHERE id = $1 AND current_participants > 0
            "#,
        )
        .bind(id)
        .execute(conn)
        .await;
        timer.record();
        Ok(result?.rows_affected() == 1)
    }

    pub async fn touch(&self, conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bookings SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// IDs of bookings holding a pending invitation or waitlist entry whose
    /// deadline has passed.
    pub async fn find_with_stale_items(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("find_bookings_with_stale_items");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT booking_id FROM group_booking_invitations
            WHERE status = 'pending' AND expires_at < $1
            UNION
            SELECT booking_id FROM booking_waitlist
            WHERE status IN ('waiting', 'notified') AND expires_at <= $1
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
