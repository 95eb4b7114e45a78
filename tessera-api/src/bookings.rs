use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tessera_core::{Booking, BookingError, BookingStatus, Payment, PaymentStatus};
use tessera_store::{BookingRepository, PaymentRepository};

use crate::error::ApiError;
use crate::state::AppState;

fn default_payment_method() -> String {
    "card".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub ticket_count: i32,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub ticket_count: i32,
    pub total_amount_cents: i64,
    pub reference: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInfo>,
}

#[derive(Debug, Serialize)]
pub struct PaymentInfo {
    pub amount_cents: i64,
    pub method: String,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id,
            user_id: booking.user_id,
            event_id: booking.event_id,
            ticket_count: booking.ticket_count,
            total_amount_cents: booking.total_amount_cents,
            reference: booking.reference,
            status: booking.status,
            payment_status: booking.payment_status,
            created_at: booking.created_at,
            expires_at: booking.expires_at,
            payment: None,
        }
    }
}

impl From<Payment> for PaymentInfo {
    fn from(payment: Payment) -> Self {
        Self {
            amount_cents: payment.amount_cents,
            method: payment.method,
            transaction_id: payment.transaction_id,
            status: payment.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub user_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelBookingResponse {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub refund_amount_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    #[serde(default = "default_payment_method")]
    pub method: String,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub expired_count: u64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

/// Clamp the raw query parameters into a sane window. The offset
/// saturates so an absurd page number yields an empty page, not an
/// overflow.
fn page_window(params: &PageParams) -> (i64, i64, i64) {
    let page = params.page.max(1);
    let per_page = params.per_page.clamp(1, 100);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

#[derive(Debug, Serialize)]
pub struct UserBookingsResponse {
    pub bookings: Vec<BookingResponse>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/user/{user_id}", get(list_user_bookings))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/confirm-payment", post(confirm_payment))
        .route("/v1/bookings/cleanup-expired", post(cleanup_expired))
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let booking = state
        .reservations
        .reserve(req.user_id, req.event_id, req.ticket_count, &req.payment_method)
        .await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = BookingRepository::get(&state.db.pool, id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::from(BookingError::NotFound(format!("booking {}", id))))?;

    let payment = PaymentRepository::get_for_booking(&state.db.pool, id)
        .await
        .map_err(ApiError::internal)?;

    let mut response = BookingResponse::from(booking);
    response.payment = payment.map(PaymentInfo::from);

    Ok(Json(response))
}

async fn list_user_bookings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<UserBookingsResponse>, ApiError> {
    let (page, per_page, offset) = page_window(&params);

    let bookings = BookingRepository::list_for_user(&state.db.pool, user_id, per_page, offset)
        .await
        .map_err(ApiError::internal)?;
    let total = BookingRepository::count_for_user(&state.db.pool, user_id)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(UserBookingsResponse {
        bookings: bookings.into_iter().map(BookingResponse::from).collect(),
        page,
        per_page,
        total,
    }))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<Json<CancelBookingResponse>, ApiError> {
    let outcome = state.cancellations.cancel(id, req.user_id, req.reason).await?;

    Ok(Json(CancelBookingResponse {
        booking_id: outcome.booking.id,
        status: outcome.booking.status,
        refund_amount_cents: outcome.refund_amount_cents,
    }))
}

/// Reconciliation hook, not a public user action: applies the same
/// idempotent pending-to-confirmed transition the worker uses. The
/// caller gets the result synchronously; no confirmation message is
/// queued from here.
async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state
        .reservations
        .confirm_payment(id, &req.method, req.transaction_id)
        .await?;

    Ok(Json(BookingResponse::from(booking)))
}

/// Manual sweep trigger for external schedulers.
async fn cleanup_expired(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let expired_count = state.sweeper.sweep_expired().await?;

    Ok(Json(CleanupResponse { expired_count }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_default() {
        let params: PageParams = serde_json::from_str("{}").unwrap();
        assert_eq!(page_window(&params), (1, 20, 0));
    }

    #[test]
    fn test_page_window_clamps_extremes() {
        let params = PageParams {
            page: 0,
            per_page: 500,
        };
        assert_eq!(page_window(&params), (1, 100, 0));

        let params = PageParams {
            page: 3,
            per_page: 10,
        };
        assert_eq!(page_window(&params), (3, 10, 20));

        let params = PageParams {
            page: i64::MAX,
            per_page: 20,
        };
        assert_eq!(page_window(&params), (i64::MAX, 20, i64::MAX));
    }

    #[test]
    fn test_create_request_defaults_to_card() {
        let json = format!(
            r#"{{"user_id":"{}","event_id":"{}","ticket_count":2}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let req: CreateBookingRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.payment_method, "card");
    }
}
