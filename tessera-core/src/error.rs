use uuid::Uuid;

use crate::models::BookingStatus;

/// Failure taxonomy for the reservation domain. Services return these,
/// the HTTP layer maps them onto status codes, and the reconciliation
/// worker branches on them to decide between retry and done.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Another reservation attempt holds the event lock")]
    Busy,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Event has already started")]
    PastEvent,

    #[error("Insufficient tickets: requested {requested}, available {available}")]
    Insufficient { requested: i32, available: i32 },

    #[error("User already holds an active booking for event {0}")]
    DuplicateBooking(Uuid),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Booking belongs to a different user")]
    NotOwner,

    #[error("Confirmed bookings cannot be cancelled within {hours} hours of the event")]
    CancellationWindowClosed { hours: i64 },

    #[error("Illegal booking transition from {from} to {attempted}")]
    StateConflict {
        from: BookingStatus,
        attempted: BookingStatus,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Wrap an infrastructure failure (database, lock service, queue).
    pub fn internal(err: impl std::fmt::Display) -> Self {
        BookingError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_conflict() {
        let err = BookingError::StateConflict {
            from: BookingStatus::Expired,
            attempted: BookingStatus::Confirmed,
        };
        assert_eq!(
            err.to_string(),
            "Illegal booking transition from expired to confirmed"
        );

        let err = BookingError::Insufficient {
            requested: 4,
            available: 1,
        };
        assert_eq!(err.to_string(), "Insufficient tickets: requested 4, available 1");
    }
}
