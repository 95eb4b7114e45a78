use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use tessera_core::{Booking, BookingError, BookingStatus, EventStatus, Payment, PaymentStatus};
use tessera_shared::models::messages::{queues, BookingNotification, PaymentTask};
use tessera_store::app_config::BusinessRules;
use tessera_store::lock::event_booking_lock_key;
use tessera_store::{
    BookingRepository, DbClient, EventProducer, EventRepository, LockClient, PaymentRepository,
};

use crate::metrics::Metrics;

/// Serializes reservation attempts per event and owns the booking write
/// path. The Redis lock in front keeps hot events from queueing on the
/// database; the event row lock inside the transaction is the authority.
pub struct ReservationService {
    db: Arc<DbClient>,
    locks: Arc<LockClient>,
    producer: Arc<EventProducer>,
    rules: BusinessRules,
    metrics: Arc<Metrics>,
}

fn validate_ticket_count(ticket_count: i32, max_per_booking: i32) -> Result<(), BookingError> {
    if ticket_count < 1 || ticket_count > max_per_booking {
        return Err(BookingError::InvalidInput(format!(
            "ticket_count must be between 1 and {}",
            max_per_booking
        )));
    }
    Ok(())
}

impl ReservationService {
    pub fn new(
        db: Arc<DbClient>,
        locks: Arc<LockClient>,
        producer: Arc<EventProducer>,
        rules: BusinessRules,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            db,
            locks,
            producer,
            rules,
            metrics,
        }
    }

    /// Reserve tickets on an event. Fails fast with `Busy` when another
    /// attempt holds the event lock; the caller is expected to retry.
    pub async fn reserve(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        ticket_count: i32,
        payment_method: &str,
    ) -> Result<Booking, BookingError> {
        validate_ticket_count(ticket_count, self.rules.max_tickets_per_booking)?;

        let lock_key = event_booking_lock_key(event_id);
        let token = self
            .locks
            .acquire(&lock_key, self.rules.lock_ttl_seconds)
            .await
            .map_err(BookingError::internal)?;

        let Some(token) = token else {
            self.metrics.reservations_rejected_busy.inc();
            return Err(BookingError::Busy);
        };

        let result = self.reserve_locked(user_id, event_id, ticket_count).await;

        // Release on every path out. A failed release only means the TTL
        // cleans up for us.
        match self.locks.release(&lock_key, &token).await {
            Ok(true) => {}
            Ok(false) => warn!("Lock for event {} expired before release", event_id),
            Err(e) => warn!("Failed to release lock for event {}: {}", event_id, e),
        }

        let booking = match result {
            Ok(booking) => booking,
            Err(e) => {
                if matches!(e, BookingError::Insufficient { .. }) {
                    self.metrics.reservations_rejected_insufficient.inc();
                }
                return Err(e);
            }
        };

        self.metrics.bookings_created.inc();
        info!(
            "Reserved booking {} ({} tickets on event {}) for user {}",
            booking.id, booking.ticket_count, event_id, user_id
        );

        self.publish_created(&booking, payment_method).await;

        Ok(booking)
    }

    /// The transactional half of reserve. Dropping the transaction on any
    /// error path rolls back both the booking row and the inventory move.
    async fn reserve_locked(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        ticket_count: i32,
    ) -> Result<Booking, BookingError> {
        let mut tx = self.db.pool.begin().await.map_err(BookingError::internal)?;

        let event = EventRepository::lock_event(&mut tx, event_id)
            .await
            .map_err(BookingError::internal)?
            .filter(|event| event.status == EventStatus::Active)
            .ok_or_else(|| BookingError::NotFound(format!("event {}", event_id)))?;

        if event.starts_at <= Utc::now() {
            return Err(BookingError::PastEvent);
        }

        if event.available_tickets < ticket_count {
            return Err(BookingError::Insufficient {
                requested: ticket_count,
                available: event.available_tickets,
            });
        }

        if self.rules.single_booking_per_event
            && BookingRepository::user_has_active(&mut tx, user_id, event_id)
                .await
                .map_err(BookingError::internal)?
        {
            return Err(BookingError::DuplicateBooking(event_id));
        }

        let total_amount_cents = event.price_cents * ticket_count as i64;
        let booking = Booking::new(
            user_id,
            event_id,
            ticket_count,
            total_amount_cents,
            Duration::minutes(self.rules.reservation_window_minutes),
        );

        BookingRepository::insert(&mut tx, &booking)
            .await
            .map_err(BookingError::internal)?;
        EventRepository::take_tickets(&mut tx, event_id, ticket_count)
            .await
            .map_err(BookingError::internal)?;

        tx.commit().await.map_err(BookingError::internal)?;

        Ok(booking)
    }

    /// Queue fan-out after commit. Failures are logged, never returned:
    /// the booking stands, and one left unpaid is reclaimed by the sweep.
    async fn publish_created(&self, booking: &Booking, payment_method: &str) {
        let notification = BookingNotification::BookingCreated {
            booking_id: booking.id,
            user_id: booking.user_id,
            event_id: booking.event_id,
            reference: booking.reference.clone(),
            ticket_count: booking.ticket_count,
            total_amount_cents: booking.total_amount_cents,
            expires_at: booking.expires_at,
        };
        if let Err(e) = self
            .producer
            .publish_json(
                queues::BOOKING_NOTIFICATIONS,
                &booking.id.to_string(),
                &notification,
            )
            .await
        {
            warn!(
                "Failed to publish creation notice for booking {}: {}",
                booking.id, e
            );
        }

        let task = PaymentTask {
            booking_id: booking.id,
            user_id: booking.user_id,
            amount_cents: booking.total_amount_cents,
            reference: booking.reference.clone(),
            method: payment_method.to_string(),
            retry_count: 0,
        };
        if let Err(e) = self
            .producer
            .publish_json(queues::PAYMENT_PROCESSING, &booking.id.to_string(), &task)
            .await
        {
            warn!(
                "Failed to queue payment task for booking {}: {}",
                booking.id, e
            );
        }
    }

    /// Settlement write path, driven by the reconciliation worker. One
    /// transaction; a booking no longer pending comes back as
    /// `StateConflict` with nothing written.
    pub async fn confirm_payment(
        &self,
        booking_id: Uuid,
        method: &str,
        transaction_id: Option<String>,
    ) -> Result<Booking, BookingError> {
        let mut tx = self.db.pool.begin().await.map_err(BookingError::internal)?;

        let mut booking = BookingRepository::lock_booking(&mut tx, booking_id)
            .await
            .map_err(BookingError::internal)?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))?;

        booking.transition(BookingStatus::Confirmed)?;
        booking.payment_status = PaymentStatus::Completed;

        BookingRepository::update_status(&mut tx, booking.id, booking.status, booking.payment_status)
            .await
            .map_err(BookingError::internal)?;

        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            amount_cents: booking.total_amount_cents,
            method: method.to_string(),
            transaction_id,
            status: PaymentStatus::Completed,
            created_at: Utc::now(),
        };
        PaymentRepository::insert(&mut tx, &payment)
            .await
            .map_err(BookingError::internal)?;

        tx.commit().await.map_err(BookingError::internal)?;

        self.metrics.bookings_confirmed.inc();
        info!("Confirmed booking {} after approved charge", booking_id);

        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_count_bounds() {
        assert!(validate_ticket_count(1, 10).is_ok());
        assert!(validate_ticket_count(10, 10).is_ok());

        assert!(matches!(
            validate_ticket_count(0, 10),
            Err(BookingError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_ticket_count(-3, 10),
            Err(BookingError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_ticket_count(11, 10),
            Err(BookingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_ticket_count_limit_names_the_cap() {
        let err = validate_ticket_count(7, 4).unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: ticket_count must be between 1 and 4");
    }
}
