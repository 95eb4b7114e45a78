pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod event_repo;
pub mod lock;
pub mod payment_repo;
pub mod producer;

pub use booking_repo::BookingRepository;
pub use database::DbClient;
pub use event_repo::EventRepository;
pub use lock::LockClient;
pub use payment_repo::PaymentRepository;
pub use producer::EventProducer;
