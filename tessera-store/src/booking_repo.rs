use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use tessera_core::{Booking, BookingStatus, PaymentStatus};

const BOOKING_COLUMNS: &str = "id, user_id, event_id, ticket_count, total_amount_cents, \
     reference, status, payment_status, created_at, expires_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    event_id: Uuid,
    ticket_count: i32,
    total_amount_cents: i64,
    reference: String,
    status: String,
    payment_status: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, sqlx::Error> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown booking status: {}", self.status).into()))?;
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown payment status: {}", self.payment_status).into())
        })?;

        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            event_id: self.event_id,
            ticket_count: self.ticket_count,
            total_amount_cents: self.total_amount_cents,
            reference: self.reference,
            status,
            payment_status,
            created_at: self.created_at,
            expires_at: self.expires_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct BookingRepository;

impl BookingRepository {
    pub async fn insert(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        booking: &Booking,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, event_id, ticket_count, total_amount_cents,
                                  reference, status, payment_status, created_at, expires_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.event_id)
        .bind(booking.ticket_count)
        .bind(booking.total_amount_cents)
        .bind(&booking.reference)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.created_at)
        .bind(booking.expires_at)
        .bind(booking.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Row-lock one booking for a status transition.
    pub async fn lock_booking(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(BookingRow::into_booking).transpose()
    }

    pub async fn get(pool: &PgPool, booking_id: Uuid) -> Result<Option<Booking>, sqlx::Error> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(pool)
        .await?;

        row.map(BookingRow::into_booking).transpose()
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Does the user already hold a pending or confirmed booking for this
    /// event?
    pub async fn user_has_active(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE user_id = $1 AND event_id = $2 AND status IN ('pending', 'confirmed')
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(count > 0)
    }

    pub async fn update_status(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        booking_id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bookings SET status = $1, payment_status = $2, updated_at = $3 WHERE id = $4")
            .bind(status.as_str())
            .bind(payment_status.as_str())
            .bind(Utc::now())
            .bind(booking_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Lock every pending booking whose payment window has lapsed. Oldest
    /// first for a stable locking order across concurrent sweeps.
    pub async fn lock_expired_pending(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE status = 'pending' AND expires_at < $1 \
             ORDER BY created_at ASC FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(now)
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    /// Terminal bulk update for a sweep batch.
    pub async fn mark_expired(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        booking_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE bookings SET status = 'expired', updated_at = $1 WHERE id = ANY($2)")
                .bind(now)
                .bind(booking_ids)
                .execute(&mut **tx)
                .await?;

        Ok(result.rows_affected())
    }
}
