use async_trait::async_trait;
use uuid::Uuid;

/// Outcome declared by the payment provider for a charge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Approved { transaction_id: String },
    Declined { reason: String },
}

/// Transport-level failure reaching the provider (timeout, connection
/// reset, provider 5xx). A decline is not an error; it arrives as a
/// `ChargeOutcome`.
#[derive(Debug, thiserror::Error)]
#[error("Payment gateway unreachable: {0}")]
pub struct GatewayError(pub String);

/// The external payment provider boundary. The engine only ever asks it
/// one question; everything else about the provider is out of scope.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempt to charge the full booking amount.
    async fn charge(
        &self,
        booking_id: Uuid,
        amount_cents: i64,
        method: &str,
    ) -> Result<ChargeOutcome, GatewayError>;
}
