use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use tessera_core::{Booking, BookingError, BookingStatus, Payment, PaymentStatus};
use tessera_shared::models::messages::{queues, BookingNotification};
use tessera_store::app_config::BusinessRules;
use tessera_store::{BookingRepository, DbClient, EventProducer, EventRepository, PaymentRepository};

use crate::metrics::Metrics;

/// What a cancellation produced. The refund amount is reported to the
/// caller; executing it is the payment provider's problem.
#[derive(Debug)]
pub struct CancellationOutcome {
    pub booking: Booking,
    pub refund_amount_cents: i64,
}

#[derive(Clone, Copy)]
enum CancelMode<'a> {
    /// User-driven cancel over the API. Ownership and cutoff rules apply.
    User { user_id: Uuid },
    /// Reconciliation compensation after a failed charge.
    PaymentFailure { method: &'a str },
}

/// A confirmed booking can only cancel while the event is still at least
/// `cutoff_hours` away. Exactly on the boundary still cancels.
fn cancellation_window_closed(
    starts_at: DateTime<Utc>,
    now: DateTime<Utc>,
    cutoff_hours: i64,
) -> bool {
    starts_at - now < Duration::hours(cutoff_hours)
}

pub struct CancellationService {
    db: Arc<DbClient>,
    producer: Arc<EventProducer>,
    rules: BusinessRules,
    metrics: Arc<Metrics>,
}

impl CancellationService {
    pub fn new(
        db: Arc<DbClient>,
        producer: Arc<EventProducer>,
        rules: BusinessRules,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            db,
            producer,
            rules,
            metrics,
        }
    }

    /// Cancel a booking on the user's behalf, returning tickets to the
    /// pool and reporting the refund owed.
    pub async fn cancel(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        reason: Option<String>,
    ) -> Result<CancellationOutcome, BookingError> {
        let outcome = self
            .cancel_tx(booking_id, CancelMode::User { user_id })
            .await?;

        self.metrics.bookings_cancelled.inc();
        info!(
            "Cancelled booking {} for user {} (refund {} cents)",
            booking_id, user_id, outcome.refund_amount_cents
        );

        let notification = BookingNotification::BookingCancelled {
            booking_id: outcome.booking.id,
            user_id: outcome.booking.user_id,
            event_id: outcome.booking.event_id,
            reference: outcome.booking.reference.clone(),
            refund_amount_cents: outcome.refund_amount_cents,
            reason,
        };
        self.publish(booking_id, &notification).await;

        Ok(outcome)
    }

    /// Compensating cancel after a declined or unreachable charge:
    /// releases inventory, marks the payment failed, and records the
    /// failed attempt. A booking that is no longer pending comes back as
    /// `StateConflict`, which callers treat as already handled.
    pub async fn compensate_payment_failure(
        &self,
        booking_id: Uuid,
        method: &str,
        reason: &str,
    ) -> Result<(), BookingError> {
        let outcome = self
            .cancel_tx(booking_id, CancelMode::PaymentFailure { method })
            .await?;

        self.metrics.bookings_cancelled.inc();
        self.metrics.payments_failed.inc();
        info!(
            "Compensated booking {} after failed payment: {}",
            booking_id, reason
        );

        let notification = BookingNotification::PaymentFailed {
            booking_id: outcome.booking.id,
            user_id: outcome.booking.user_id,
            reference: outcome.booking.reference.clone(),
            reason: reason.to_string(),
        };
        self.publish(booking_id, &notification).await;

        Ok(())
    }

    async fn cancel_tx(
        &self,
        booking_id: Uuid,
        mode: CancelMode<'_>,
    ) -> Result<CancellationOutcome, BookingError> {
        let mut tx = self.db.pool.begin().await.map_err(BookingError::internal)?;

        let mut booking = BookingRepository::lock_booking(&mut tx, booking_id)
            .await
            .map_err(BookingError::internal)?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))?;

        let event = EventRepository::lock_event(&mut tx, booking.event_id)
            .await
            .map_err(BookingError::internal)?
            .ok_or_else(|| {
                BookingError::internal(format!(
                    "event {} missing for booking {}",
                    booking.event_id, booking_id
                ))
            })?;

        match mode {
            CancelMode::User { user_id } => {
                if booking.user_id != user_id {
                    return Err(BookingError::NotOwner);
                }
                if booking.status == BookingStatus::Confirmed
                    && cancellation_window_closed(
                        event.starts_at,
                        Utc::now(),
                        self.rules.cancellation_cutoff_hours,
                    )
                {
                    return Err(BookingError::CancellationWindowClosed {
                        hours: self.rules.cancellation_cutoff_hours,
                    });
                }
            }
            CancelMode::PaymentFailure { .. } => {
                // Compensation only applies to bookings still awaiting
                // payment. Anything else settled some other way first.
                if booking.status != BookingStatus::Pending {
                    return Err(BookingError::StateConflict {
                        from: booking.status,
                        attempted: BookingStatus::Cancelled,
                    });
                }
            }
        }

        booking.transition(BookingStatus::Cancelled)?;

        EventRepository::return_tickets(&mut tx, booking.event_id, booking.ticket_count)
            .await
            .map_err(BookingError::internal)?;

        let refund_amount_cents = booking.refund_amount_cents();
        booking.payment_status = match mode {
            CancelMode::User { .. } if refund_amount_cents > 0 => PaymentStatus::Refunded,
            CancelMode::User { .. } => booking.payment_status,
            CancelMode::PaymentFailure { .. } => PaymentStatus::Failed,
        };

        BookingRepository::update_status(&mut tx, booking.id, booking.status, booking.payment_status)
            .await
            .map_err(BookingError::internal)?;

        if let CancelMode::PaymentFailure { method } = mode {
            let payment = Payment {
                id: Uuid::new_v4(),
                booking_id: booking.id,
                amount_cents: booking.total_amount_cents,
                method: method.to_string(),
                transaction_id: None,
                status: PaymentStatus::Failed,
                created_at: Utc::now(),
            };
            PaymentRepository::insert(&mut tx, &payment)
                .await
                .map_err(BookingError::internal)?;
        }

        tx.commit().await.map_err(BookingError::internal)?;

        Ok(CancellationOutcome {
            booking,
            refund_amount_cents,
        })
    }

    async fn publish(&self, booking_id: Uuid, notification: &BookingNotification) {
        if let Err(e) = self
            .producer
            .publish_json(
                queues::BOOKING_NOTIFICATIONS,
                &booking_id.to_string(),
                notification,
            )
            .await
        {
            warn!(
                "Failed to publish cancellation notice for booking {}: {}",
                booking_id, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_blocks_inside_window() {
        let now = Utc::now();
        assert!(cancellation_window_closed(now + Duration::hours(23), now, 24));
        assert!(cancellation_window_closed(now + Duration::minutes(5), now, 24));
    }

    #[test]
    fn test_cutoff_allows_outside_window() {
        let now = Utc::now();
        assert!(!cancellation_window_closed(now + Duration::hours(25), now, 24));
        assert!(!cancellation_window_closed(now + Duration::days(30), now, 24));
    }

    #[test]
    fn test_cutoff_boundary_still_cancels() {
        let now = Utc::now();
        assert!(!cancellation_window_closed(now + Duration::hours(24), now, 24));
    }

    #[test]
    fn test_cutoff_closed_once_event_started() {
        let now = Utc::now();
        assert!(cancellation_window_closed(now - Duration::hours(1), now, 24));
    }
}
