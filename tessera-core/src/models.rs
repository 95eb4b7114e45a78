use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BookingError;

/// Catalog status of an event. Only active events accept reservations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Active,
    Inactive,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Inactive => "inactive",
            EventStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(EventStatus::Active),
            "inactive" => Some(EventStatus::Inactive),
            "cancelled" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "expired" => Some(BookingStatus::Expired),
            _ => None,
        }
    }

    /// The full transition table. Nothing ever returns to pending.
    pub fn can_transition(&self, to: BookingStatus) -> bool {
        matches!(
            (self, to),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Pending, BookingStatus::Expired)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    /// True when no outgoing transition exists at all.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Expired)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment progress, tracked on the booking and mirrored on the payment
/// record once reconciliation settles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ticketed event. `available_tickets` is the authoritative inventory
/// counter and only moves inside transactions that also touch a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub total_tickets: i32,
    pub available_tickets: i32,
    pub price_cents: i64,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's claim on tickets. Created pending, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub ticket_count: i32,
    pub total_amount_cents: i64,
    pub reference: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        user_id: Uuid,
        event_id: Uuid,
        ticket_count: i32,
        total_amount_cents: i64,
        payment_window: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            ticket_count,
            total_amount_cents,
            reference: generate_reference(),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            expires_at: now + payment_window,
            updated_at: now,
        }
    }

    /// Checked status transition. Illegal moves leave the booking
    /// untouched.
    pub fn transition(&mut self, to: BookingStatus) -> Result<(), BookingError> {
        if !self.status.can_transition(to) {
            return Err(BookingError::StateConflict {
                from: self.status,
                attempted: to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// A booking is sweep-eligible only while still pending.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending && self.expires_at < now
    }

    /// Refund owed on cancellation: the full amount when the booking was
    /// paid, nothing otherwise.
    pub fn refund_amount_cents(&self) -> i64 {
        if self.payment_status == PaymentStatus::Completed {
            self.total_amount_cents
        } else {
            0
        }
    }
}

/// One payment attempt outcome per booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount_cents: i64,
    pub method: String,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Opaque booking reference handed to the user.
pub fn generate_reference() -> String {
    format!("TSR-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_booking() -> Booking {
        Booking::new(Uuid::new_v4(), Uuid::new_v4(), 2, 5000, Duration::minutes(15))
    }

    #[test]
    fn test_new_booking_starts_pending() {
        let booking = pending_booking();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert!(booking.expires_at > booking.created_at);
    }

    #[test]
    fn test_transition_table() {
        use BookingStatus::*;

        let legal = [
            (Pending, Confirmed),
            (Pending, Cancelled),
            (Pending, Expired),
            (Confirmed, Cancelled),
        ];
        for (from, to) in legal {
            assert!(from.can_transition(to), "{} -> {} should be legal", from, to);
        }

        let illegal = [
            (Confirmed, Confirmed),
            (Confirmed, Expired),
            (Confirmed, Pending),
            (Cancelled, Pending),
            (Cancelled, Confirmed),
            (Cancelled, Expired),
            (Expired, Pending),
            (Expired, Confirmed),
            (Expired, Cancelled),
            (Pending, Pending),
        ];
        for (from, to) in illegal {
            assert!(!from.can_transition(to), "{} -> {} should be illegal", from, to);
        }
    }

    #[test]
    fn test_illegal_transition_has_no_side_effects() {
        let mut booking = pending_booking();
        booking.transition(BookingStatus::Expired).unwrap();
        let updated_at = booking.updated_at;

        let result = booking.transition(BookingStatus::Confirmed);
        assert!(matches!(
            result,
            Err(BookingError::StateConflict {
                from: BookingStatus::Expired,
                attempted: BookingStatus::Confirmed,
            })
        ));
        assert_eq!(booking.status, BookingStatus::Expired);
        assert_eq!(booking.updated_at, updated_at);
    }

    #[test]
    fn test_confirmed_booking_can_still_cancel() {
        let mut booking = pending_booking();
        booking.transition(BookingStatus::Confirmed).unwrap();
        assert!(!booking.status.is_terminal());
        booking.transition(BookingStatus::Cancelled).unwrap();
        assert!(booking.status.is_terminal());
    }

    #[test]
    fn test_refund_follows_payment_status() {
        let mut booking = pending_booking();
        assert_eq!(booking.refund_amount_cents(), 0);

        booking.payment_status = PaymentStatus::Completed;
        assert_eq!(booking.refund_amount_cents(), 5000);

        booking.payment_status = PaymentStatus::Failed;
        assert_eq!(booking.refund_amount_cents(), 0);
    }

    #[test]
    fn test_expiry_requires_pending_status() {
        let mut booking = pending_booking();
        let after_window = booking.expires_at + Duration::seconds(1);

        assert!(booking.is_expired_at(after_window));
        assert!(!booking.is_expired_at(booking.expires_at));

        booking.transition(BookingStatus::Confirmed).unwrap();
        assert!(!booking.is_expired_at(after_window));
    }

    #[test]
    fn test_reference_format() {
        let reference = generate_reference();
        assert!(reference.starts_with("TSR-"));
        assert_eq!(reference.len(), "TSR-".len() + 32);
    }

    #[test]
    fn test_status_serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&BookingStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&PaymentStatus::Refunded).unwrap(), "\"refunded\"");
        assert_eq!(serde_json::to_string(&EventStatus::Active).unwrap(), "\"active\"");

        let status: BookingStatus = serde_json::from_str("\"expired\"").unwrap();
        assert_eq!(status, BookingStatus::Expired);
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Expired,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("unknown"), None);

        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
    }
}
