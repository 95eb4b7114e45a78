use chrono::{DateTime, Utc};
use sqlx::Postgres;
use uuid::Uuid;

use tessera_core::{Event, EventStatus};

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    venue: String,
    starts_at: DateTime<Utc>,
    total_tickets: i32,
    available_tickets: i32,
    price_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EventRow {
    fn into_event(self) -> Result<Event, sqlx::Error> {
        let status = EventStatus::parse(&self.status)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown event status: {}", self.status).into()))?;

        Ok(Event {
            id: self.id,
            title: self.title,
            venue: self.venue,
            starts_at: self.starts_at,
            total_tickets: self.total_tickets,
            available_tickets: self.available_tickets,
            price_cents: self.price_cents,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct EventRepository;

impl EventRepository {
    /// Row-lock the event for the duration of the surrounding transaction.
    /// This lock, not the Redis one, is the authority over inventory.
    pub async fn lock_event(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> Result<Option<Event>, sqlx::Error> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, title, venue, starts_at, total_tickets, available_tickets,
                   price_cents, status, created_at, updated_at
            FROM events
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(EventRow::into_event).transpose()
    }

    /// Claim tickets for a booking. Caller must hold the event row lock
    /// and have verified availability.
    pub async fn take_tickets(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        event_id: Uuid,
        ticket_count: i32,
    ) -> Result<(), sqlx::Error> {
        Self::adjust_available(tx, event_id, -ticket_count).await
    }

    /// Return tickets to the pool on cancellation or expiry.
    pub async fn return_tickets(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        event_id: Uuid,
        ticket_count: i32,
    ) -> Result<(), sqlx::Error> {
        Self::adjust_available(tx, event_id, ticket_count).await
    }

    // Every inventory mutation funnels through here; the schema CHECK
    // constraints backstop the in-transaction validation.
    async fn adjust_available(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        event_id: Uuid,
        delta: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE events
            SET available_tickets = available_tickets + $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(event_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
