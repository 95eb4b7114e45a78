use prometheus::{IntCounter, Registry};

/// Counters for the booking lifecycle and the payment reconciliation loop.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub reservations_rejected_busy: IntCounter,
    pub reservations_rejected_insufficient: IntCounter,
    pub bookings_confirmed: IntCounter,
    pub bookings_cancelled: IntCounter,
    pub bookings_expired: IntCounter,
    pub payments_failed: IntCounter,
    pub reconcile_retries: IntCounter,
    pub reconcile_dead_letters: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let bookings_created = IntCounter::new(
            "tessera_bookings_created_total",
            "Bookings successfully reserved",
        )?;
        let reservations_rejected_busy = IntCounter::new(
            "tessera_reservations_rejected_busy_total",
            "Reservation attempts rejected because the event lock was held",
        )?;
        let reservations_rejected_insufficient = IntCounter::new(
            "tessera_reservations_rejected_insufficient_total",
            "Reservation attempts rejected for insufficient tickets",
        )?;
        let bookings_confirmed = IntCounter::new(
            "tessera_bookings_confirmed_total",
            "Bookings confirmed after an approved charge",
        )?;
        let bookings_cancelled = IntCounter::new(
            "tessera_bookings_cancelled_total",
            "Bookings cancelled by users or payment compensation",
        )?;
        let bookings_expired = IntCounter::new(
            "tessera_bookings_expired_total",
            "Pending bookings expired by the sweeper",
        )?;
        let payments_failed = IntCounter::new(
            "tessera_payments_failed_total",
            "Charge attempts that ended in a decline or gateway fault",
        )?;
        let reconcile_retries = IntCounter::new(
            "tessera_reconcile_retries_total",
            "Payment tasks republished for another attempt",
        )?;
        let reconcile_dead_letters = IntCounter::new(
            "tessera_reconcile_dead_letters_total",
            "Payment tasks dropped after exhausting retries",
        )?;

        registry.register(Box::new(bookings_created.clone()))?;
        registry.register(Box::new(reservations_rejected_busy.clone()))?;
        registry.register(Box::new(reservations_rejected_insufficient.clone()))?;
        registry.register(Box::new(bookings_confirmed.clone()))?;
        registry.register(Box::new(bookings_cancelled.clone()))?;
        registry.register(Box::new(bookings_expired.clone()))?;
        registry.register(Box::new(payments_failed.clone()))?;
        registry.register(Box::new(reconcile_retries.clone()))?;
        registry.register(Box::new(reconcile_dead_letters.clone()))?;

        Ok(Self {
            registry,
            bookings_created,
            reservations_rejected_busy,
            reservations_rejected_insufficient,
            bookings_confirmed,
            bookings_cancelled,
            bookings_expired,
            payments_failed,
            reconcile_retries,
            reconcile_dead_letters,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_register_and_count() {
        let metrics = Metrics::new().unwrap();

        metrics.bookings_created.inc();
        metrics.bookings_created.inc();
        metrics.reconcile_dead_letters.inc();

        assert_eq!(metrics.bookings_created.get(), 2);
        assert_eq!(metrics.reconcile_dead_letters.get(), 1);
        assert_eq!(metrics.registry().gather().len(), 9);
    }
}
