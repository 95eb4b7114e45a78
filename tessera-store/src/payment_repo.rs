use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use tessera_core::{Payment, PaymentStatus};

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount_cents: i64,
    method: String,
    transaction_id: Option<String>,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, sqlx::Error> {
        let status = PaymentStatus::parse(&self.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown payment status: {}", self.status).into())
        })?;

        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            amount_cents: self.amount_cents,
            method: self.method,
            transaction_id: self.transaction_id,
            status,
            created_at: self.created_at,
        })
    }
}

pub struct PaymentRepository;

impl PaymentRepository {
    /// Record the outcome of a charge attempt. One payment row per booking;
    /// a redelivered task that already settled is a no-op.
    pub async fn insert(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        payment: &Payment,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, amount_cents, method, transaction_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (booking_id) DO NOTHING
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.amount_cents)
        .bind(&payment.method)
        .bind(&payment.transaction_id)
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn get_for_booking(
        pool: &PgPool,
        booking_id: Uuid,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, booking_id, amount_cents, method, transaction_id, status, created_at \
             FROM payments WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_optional(pool)
        .await?;

        row.map(PaymentRow::into_payment).transpose()
    }
}
