use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

use tessera_core::BookingError;
use tessera_shared::models::messages::{queues, BookingNotification};
use tessera_store::{BookingRepository, DbClient, EventProducer, EventRepository};

use crate::metrics::Metrics;

/// Reclaims inventory from pending bookings whose payment window lapsed.
/// Runs in one transaction per sweep so a batch either fully lands or
/// not at all.
pub struct ExpirySweeper {
    db: Arc<DbClient>,
    producer: Arc<EventProducer>,
    metrics: Arc<Metrics>,
}

impl ExpirySweeper {
    pub fn new(db: Arc<DbClient>, producer: Arc<EventProducer>, metrics: Arc<Metrics>) -> Self {
        Self {
            db,
            producer,
            metrics,
        }
    }

    /// One sweep pass. Returns how many bookings were expired. Safe to
    /// run concurrently with confirmations: the booking row locks
    /// serialize the two, and whichever commits first takes the row out
    /// of the other's reach.
    pub async fn sweep_expired(&self) -> Result<u64, BookingError> {
        let now = Utc::now();
        let mut tx = self.db.pool.begin().await.map_err(BookingError::internal)?;

        let expired = BookingRepository::lock_expired_pending(&mut tx, now)
            .await
            .map_err(BookingError::internal)?;

        if expired.is_empty() {
            return Ok(0);
        }

        for booking in &expired {
            EventRepository::return_tickets(&mut tx, booking.event_id, booking.ticket_count)
                .await
                .map_err(BookingError::internal)?;

            let notification = BookingNotification::BookingExpired {
                booking_id: booking.id,
                user_id: booking.user_id,
                event_id: booking.event_id,
                reference: booking.reference.clone(),
                ticket_count: booking.ticket_count,
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
                    "Failed to publish expiry notice for booking {}: {}",
                    booking.id, e
                );
            }
        }

        let ids: Vec<_> = expired.iter().map(|b| b.id).collect();
        let count = BookingRepository::mark_expired(&mut tx, &ids, now)
            .await
            .map_err(BookingError::internal)?;

        tx.commit().await.map_err(BookingError::internal)?;

        self.metrics.bookings_expired.inc_by(count);
        info!("Expired {} bookings past their payment window", count);

        Ok(count)
    }
}

/// Background sweep loop. An interval of zero disables sweeping, for
/// deployments that drive it through the admin endpoint instead.
pub async fn run_periodic(sweeper: Arc<ExpirySweeper>, interval_seconds: u64) {
    if interval_seconds == 0 {
        info!("Expiry sweep disabled by configuration");
        return;
    }

    let mut ticker = interval(Duration::from_secs(interval_seconds));
    info!("Expiry sweeper started, interval {}s", interval_seconds);

    loop {
        ticker.tick().await;
        if let Err(e) = sweeper.sweep_expired().await {
            error!("Expiry sweep failed: {}", e);
        }
    }
}
