pub mod cancel;
pub mod metrics;
pub mod reconcile;
pub mod reserve;
pub mod sweeper;

pub use cancel::{CancellationOutcome, CancellationService};
pub use metrics::Metrics;
pub use reconcile::{MockPaymentGateway, Reconciler, TaskOutcome};
pub use reserve::ReservationService;
pub use sweeper::ExpirySweeper;
