use std::sync::Arc;

use chrono::Utc;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;

use super::consumer::ConsumerState;
use super::envelope::{header_str, Inbound, ERROR_MESSAGE_HEADER, ERROR_TYPE_HEADER};
use crate::config::Config;
use crate::domain::DeadLetterRecord;
use crate::error::StoreError;
use crate::metrics::Metrics;
use crate::shutdown::ShutdownListener;
use crate::storage::OrderStore;

// ============================================================================
// Dead-Letter Consumer - terminal sink
// ============================================================================
//
// Reads the dead-letter topic and persists a record of each message for a
// human to inspect: raw value, failure classification from the headers and
// the receipt time. It never republishes; dead-letter is terminal. A store
// failure here is logged and the message skipped, because no further
// escalation path exists.
// ============================================================================

pub struct DeadLetterConsumer {
    consumer: StreamConsumer,
    sink: DeadLetterSink,
    state: ConsumerState,
}

/// Broker-independent persistence step. Holds no publisher on purpose;
/// nothing leaves this stage.
struct DeadLetterSink {
    store: Arc<dyn OrderStore>,
    metrics: Arc<Metrics>,
}

impl DeadLetterSink {
    async fn persist(&self, inbound: &Inbound<'_>) -> Result<(), StoreError> {
        let record = DeadLetterRecord {
            topic: inbound.topic.to_string(),
            key: inbound.key_lossy().into_owned(),
            value: inbound.payload_lossy().into_owned(),
            error_type: header_str(inbound.headers.as_ref(), ERROR_TYPE_HEADER),
            error_message: header_str(inbound.headers.as_ref(), ERROR_MESSAGE_HEADER),
            received_at: Utc::now(),
        };
        self.store.append_dead_letter(&record).await?;
        self.metrics.record_dead_letter_stored();
        Ok(())
    }
}

impl DeadLetterConsumer {
    pub fn connect(
        config: &Config,
        store: Arc<dyn OrderStore>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, KafkaError> {
        let consumer = super::subscriber(config, &config.dlq_topic)?;
        Ok(Self {
            consumer,
            sink: DeadLetterSink { store, metrics },
            state: ConsumerState::Running,
        })
    }

    pub async fn run(mut self, mut shutdown: ShutdownListener) {
        tracing::info!("🪦 Dead-letter consumer running");

        while self.state == ConsumerState::Running {
            tokio::select! {
                _ = shutdown.stopped() => {
                    self.state = ConsumerState::Stopping;
                    tracing::info!("Dead-letter consumer stopping");
                }
                received = self.consumer.recv() => match received {
                    Ok(message) => {
                        let inbound = Inbound::from_message(&message);
                        match self.sink.persist(&inbound).await {
                            Ok(()) => tracing::info!(
                                key = %inbound.key_lossy(),
                                "Dead letter stored"
                            ),
                            Err(error) => tracing::error!(
                                key = %inbound.key_lossy(),
                                %error,
                                "Dead letter could not be stored, skipping"
                            ),
                        }
                        if let Err(error) =
                            self.consumer.commit_message(&message, CommitMode::Async)
                        {
                            tracing::warn!(%error, "Offset commit failed");
                        }
                    }
                    Err(error) => tracing::error!(%error, "Broker read failed"),
                },
            }
        }

        drop(self.consumer);
        self.state = ConsumerState::Stopped;
        tracing::info!("Dead-letter consumer stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rdkafka::message::OwnedHeaders;

    use crate::messaging::envelope::{stamp_attempt, with_error};
    use crate::storage::MemoryStore;

    fn sink() -> (DeadLetterSink, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let sink = DeadLetterSink {
            store: store.clone(),
            metrics: Arc::new(Metrics::new().unwrap()),
        };
        (sink, store)
    }

    #[tokio::test]
    async fn test_persists_record_with_classification() {
        let (sink, store) = sink();
        let headers = with_error(
            Some(&stamp_attempt::<OwnedHeaders>(None, 3)),
            "persistence",
            "db down",
        );
        let inbound = Inbound {
            topic: "orders_dlq",
            key: b"order-3",
            payload: b"{\"order_uid\":\"order-3\"}",
            attempt: 3,
            headers: Some(headers),
        };

        sink.persist(&inbound).await.unwrap();

        let records = store.dead_letters();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, "orders_dlq");
        assert_eq!(records[0].key, "order-3");
        assert_eq!(records[0].value, "{\"order_uid\":\"order-3\"}");
        assert_eq!(records[0].error_type, "persistence");
        assert_eq!(records[0].error_message, "db down");
        assert_eq!(sink.metrics.dead_letters_stored.get(), 1);
    }

    #[tokio::test]
    async fn test_missing_headers_become_empty_fields() {
        let (sink, store) = sink();
        let inbound = Inbound {
            topic: "orders_dlq",
            key: b"order-4",
            payload: b"whatever",
            attempt: 0,
            headers: None,
        };

        sink.persist(&inbound).await.unwrap();

        let records = store.dead_letters();
        assert_eq!(records[0].error_type, "");
        assert_eq!(records[0].error_message, "");
    }

    #[tokio::test]
    async fn test_non_utf8_payload_is_stored_lossily() {
        let (sink, store) = sink();
        let raw: &[u8] = &[0xFF, b'o', b'k'];
        let inbound = Inbound {
            topic: "orders_dlq",
            key: b"order-5",
            payload: raw,
            attempt: 0,
            headers: None,
        };

        sink.persist(&inbound).await.unwrap();

        assert_eq!(store.dead_letters()[0].value, "\u{FFFD}ok");
    }
}
