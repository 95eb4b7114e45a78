use std::net::SocketAddr;
use std::sync::Arc;

use tessera_api::{app, state::AppState, worker::start_reconciliation_worker};
use tessera_booking::{
    CancellationService, ExpirySweeper, Metrics, MockPaymentGateway, Reconciler,
    ReservationService,
};
use tessera_core::PaymentGateway;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tessera_api=debug,tessera_booking=debug,tower_http=debug,axum::rejection=trace"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = tessera_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Tessera API on port {}", config.server.port);

    let db = Arc::new(
        tessera_store::DbClient::new(&config.database.url, config.database.max_connections)
            .await
            .expect("Failed to connect to Postgres"),
    );
    db.migrate().await.expect("Failed to run migrations");

    let locks = Arc::new(
        tessera_store::LockClient::new(&config.redis.url).expect("Failed to create Redis client"),
    );

    let producer = Arc::new(
        tessera_store::EventProducer::new(&config.kafka.brokers)
            .expect("Failed to create Kafka producer"),
    );

    let metrics = Arc::new(Metrics::new().expect("Failed to register metrics"));

    let reservations = Arc::new(ReservationService::new(
        db.clone(),
        locks.clone(),
        producer.clone(),
        config.business_rules.clone(),
        metrics.clone(),
    ));
    let cancellations = Arc::new(CancellationService::new(
        db.clone(),
        producer.clone(),
        config.business_rules.clone(),
        metrics.clone(),
    ));
    let sweeper = Arc::new(ExpirySweeper::new(
        db.clone(),
        producer.clone(),
        metrics.clone(),
    ));

    let gateway: Arc<dyn PaymentGateway> = Arc::new(MockPaymentGateway);
    let reconciler = Arc::new(Reconciler::new(
        db.clone(),
        reservations.clone(),
        cancellations.clone(),
        gateway,
        producer.clone(),
        config.business_rules.clone(),
        metrics.clone(),
    ));

    tokio::spawn(start_reconciliation_worker(
        config.kafka.brokers.clone(),
        config.kafka.consumer_group.clone(),
        reconciler,
        metrics.clone(),
    ));
    tokio::spawn(tessera_booking::sweeper::run_periodic(
        sweeper.clone(),
        config.business_rules.sweep_interval_seconds,
    ));

    let app_state = AppState {
        db,
        reservations,
        cancellations,
        sweeper,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service()).await.unwrap();
}
