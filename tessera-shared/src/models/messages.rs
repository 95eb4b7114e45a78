use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Topic names shared by every producer and consumer in the system.
pub mod queues {
    pub const BOOKING_NOTIFICATIONS: &str = "booking-notifications";
    pub const PAYMENT_PROCESSING: &str = "payment-processing";
    pub const BOOKING_CONFIRMATIONS: &str = "booking-confirmations";
}

/// Work item on the payment-processing queue. `retry_count` travels with
/// the payload so a redelivered or requeued task knows how many attempts
/// it has already burned; first-time messages may omit it.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentTask {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub reference: String,
    pub method: String,
    #[serde(default)]
    pub retry_count: u32,
}

/// Booking lifecycle notifications, consumed by the notification service.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingNotification {
    BookingCreated {
        booking_id: Uuid,
        user_id: Uuid,
        event_id: Uuid,
        reference: String,
        ticket_count: i32,
        total_amount_cents: i64,
        expires_at: DateTime<Utc>,
    },
    BookingExpired {
        booking_id: Uuid,
        user_id: Uuid,
        event_id: Uuid,
        reference: String,
        ticket_count: i32,
    },
    BookingCancelled {
        booking_id: Uuid,
        user_id: Uuid,
        event_id: Uuid,
        reference: String,
        refund_amount_cents: i64,
        reason: Option<String>,
    },
    PaymentFailed {
        booking_id: Uuid,
        user_id: Uuid,
        reference: String,
        reason: String,
    },
}

/// Emitted on the confirmations queue once reconciliation lands a charge.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfirmationMessage {
    PaymentConfirmed {
        booking_id: Uuid,
        user_id: Uuid,
        reference: String,
        transaction_id: String,
        amount_cents: i64,
        confirmed_at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_task_retry_count_defaults_to_zero() {
        let json = format!(
            r#"{{"booking_id":"{}","user_id":"{}","amount_cents":5000,"reference":"TSR-abc","method":"card"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let task: PaymentTask = serde_json::from_str(&json).unwrap();
        assert_eq!(task.retry_count, 0);
    }

    #[test]
    fn test_payment_task_round_trips_retry_count() {
        let task = PaymentTask {
            booking_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount_cents: 1200,
            reference: "TSR-def".to_string(),
            method: "card".to_string(),
            retry_count: 2,
        };
        let json = serde_json::to_string(&task).unwrap();
        let parsed: PaymentTask = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.retry_count, 2);
        assert_eq!(parsed.amount_cents, 1200);
    }

    #[test]
    fn test_notifications_are_tagged_by_type() {
        let notification = BookingNotification::BookingExpired {
            booking_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            reference: "TSR-ghi".to_string(),
            ticket_count: 3,
        };
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "booking_expired");
        assert_eq!(value["ticket_count"], 3);
    }

    #[test]
    fn test_confirmation_message_tag() {
        let message = ConfirmationMessage::PaymentConfirmed {
            booking_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            reference: "TSR-jkl".to_string(),
            transaction_id: "txn_1".to_string(),
            amount_cents: 800,
            confirmed_at: Utc::now(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "payment_confirmed");
        assert_eq!(value["transaction_id"], "txn_1");
    }
}
