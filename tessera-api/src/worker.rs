use std::sync::Arc;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use tracing::{error, info};

use tessera_booking::{Metrics, Reconciler, TaskOutcome};
use tessera_shared::models::messages::{queues, PaymentTask};

/// Consume the payment queue one task at a time. Offsets are committed
/// manually and act as the ack: a message is only committed once its
/// outcome (settled, requeued, or dead-lettered) is durable.
pub async fn start_reconciliation_worker(
    brokers: String,
    group_id: String,
    reconciler: Arc<Reconciler>,
    metrics: Arc<Metrics>,
) {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", &group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()
        .expect("Consumer creation failed");

    consumer
        .subscribe(&[queues::PAYMENT_PROCESSING])
        .expect("Can't subscribe");

    info!("Reconciliation worker started, listening for payment tasks...");

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => {
                let payload = match m.payload_view::<str>() {
                    Some(Ok(payload)) => payload,
                    Some(Err(e)) => {
                        error!("Error reading payload: {}", e);
                        ack(&consumer, &m);
                        continue;
                    }
                    None => {
                        error!("Empty payment message, skipping");
                        ack(&consumer, &m);
                        continue;
                    }
                };

                let task: PaymentTask = match serde_json::from_str(payload) {
                    Ok(task) => task,
                    Err(e) => {
                        // Poison payload. No number of redeliveries will
                        // make it parse.
                        error!("Unparseable payment task ({}): {}", e, payload);
                        metrics.reconcile_dead_letters.inc();
                        ack(&consumer, &m);
                        continue;
                    }
                };

                match reconciler.process(task).await {
                    TaskOutcome::RequeueFailed => {
                        // Neither the requeued copy nor the ack landed.
                        // Leave the offset so the broker redelivers.
                    }
                    _ => ack(&consumer, &m),
                }
            }
        }
    }
}

fn ack(consumer: &StreamConsumer, message: &BorrowedMessage<'_>) {
    if let Err(e) = consumer.commit_message(message, CommitMode::Async) {
        error!("Failed to commit offset: {}", e);
    }
}
