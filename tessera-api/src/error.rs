use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tessera_core::BookingError;

#[derive(Debug)]
pub enum ApiError {
    Domain(BookingError),
    Internal(anyhow::Error),
}

impl ApiError {
    /// Wrap an infrastructure failure from outside the domain services.
    pub fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Domain(err)
    }
}

fn domain_status(err: &BookingError) -> (StatusCode, &'static str) {
    match err {
        BookingError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        BookingError::PastEvent => (StatusCode::BAD_REQUEST, "past_event"),
        BookingError::NotOwner => (StatusCode::FORBIDDEN, "not_owner"),
        BookingError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        BookingError::Busy => (StatusCode::CONFLICT, "busy"),
        BookingError::Insufficient { .. } => (StatusCode::CONFLICT, "insufficient_tickets"),
        BookingError::DuplicateBooking(_) => (StatusCode::CONFLICT, "duplicate_booking"),
        BookingError::StateConflict { .. } => (StatusCode::CONFLICT, "state_conflict"),
        BookingError::CancellationWindowClosed { .. } => {
            (StatusCode::CONFLICT, "cancellation_window_closed")
        }
        BookingError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Domain(err) => {
                let (status, code) = domain_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Internal Server Error: {}", err);
                    (status, code, "Internal Server Error".to_string())
                } else {
                    (status, code, err.to_string())
                }
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::BookingStatus;
    use uuid::Uuid;

    #[test]
    fn test_domain_status_map() {
        let cases = [
            (BookingError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (BookingError::PastEvent, StatusCode::BAD_REQUEST),
            (BookingError::NotOwner, StatusCode::FORBIDDEN),
            (BookingError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (BookingError::Busy, StatusCode::CONFLICT),
            (
                BookingError::Insufficient {
                    requested: 4,
                    available: 1,
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::DuplicateBooking(Uuid::new_v4()),
                StatusCode::CONFLICT,
            ),
            (
                BookingError::StateConflict {
                    from: BookingStatus::Expired,
                    attempted: BookingStatus::Confirmed,
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::CancellationWindowClosed { hours: 24 },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, _) = domain_status(&err);
            assert_eq!(status, expected, "wrong status for {:?}", err);
        }
    }

    #[test]
    fn test_busy_has_stable_code() {
        let (_, code) = domain_status(&BookingError::Busy);
        assert_eq!(code, "busy");
    }

    #[test]
    fn test_internal_detail_is_masked() {
        let response =
            ApiError::Domain(BookingError::Internal("connection pool exhausted".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
