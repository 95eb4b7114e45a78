pub mod error;
pub mod gateway;
pub mod models;

pub use error::BookingError;
pub use gateway::{ChargeOutcome, GatewayError, PaymentGateway};
pub use models::{Booking, BookingStatus, Event, EventStatus, Payment, PaymentStatus};
