use std::sync::Arc;

use tessera_booking::{CancellationService, ExpirySweeper, ReservationService};
use tessera_store::DbClient;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbClient>,
    pub reservations: Arc<ReservationService>,
    pub cancellations: Arc<CancellationService>,
    pub sweeper: Arc<ExpirySweeper>,
}
