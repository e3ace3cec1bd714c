use std::sync::Arc;
use std::time::Instant;

use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;

use super::envelope::Inbound;
use super::routing::{DeadLetterRouter, RetryRouter};
use crate::config::Config;
use crate::domain::Order;
use crate::error::OrderError;
use crate::metrics::Metrics;
use crate::service::OrderService;
use crate::shutdown::ShutdownListener;

// ============================================================================
// Order Consumer - main ingestion loop
// ============================================================================
//
// Consumes the orders topic, pushes each message through decode -> validate
// -> persist, and escalates failures: below the attempt ceiling a message
// goes to the retry stream with the counter bumped, at or above it the
// message is dead-lettered with its failure classification. The offset is
// committed either way, so one poison message can never wedge a partition.
// ============================================================================

/// Lifecycle of a consumer loop. `Stopping` lets the in-flight message
/// finish before connections are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    Stopping,
    Stopped,
}

pub struct OrderConsumer {
    consumer: StreamConsumer,
    topic: String,
    processor: Processor,
    state: ConsumerState,
}

impl OrderConsumer {
    /// Creates the consumer and proves the broker is reachable. An
    /// unreachable broker is a startup failure, not something to retry into.
    pub fn connect(
        config: &Config,
        service: Arc<OrderService>,
        retry: RetryRouter,
        dead_letter: DeadLetterRouter,
        metrics: Arc<Metrics>,
    ) -> Result<Self, KafkaError> {
        let consumer = super::subscriber(config, &config.kafka_topic)?;
        Ok(Self {
            consumer,
            topic: config.kafka_topic.clone(),
            processor: Processor {
                service,
                retry,
                dead_letter,
                metrics,
                max_attempts: config.max_attempts,
            },
            state: ConsumerState::Running,
        })
    }

    pub async fn run(mut self, mut shutdown: ShutdownListener) {
        tracing::info!(topic = %self.topic, "📦 Order consumer running");

        while self.state == ConsumerState::Running {
            tokio::select! {
                _ = shutdown.stopped() => {
                    self.state = ConsumerState::Stopping;
                    tracing::info!("Order consumer stopping");
                }
                received = self.consumer.recv() => match received {
                    Ok(message) => {
                        self.processor.handle(&Inbound::from_message(&message)).await;
                        // Failures live on in the retry or dead-letter stream,
                        // so the offset advances for every handled message.
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

        // Dropping the consumer commits nothing further, leaves the group
        // and closes the connection.
        drop(self.consumer);
        self.state = ConsumerState::Stopped;
        tracing::info!("Order consumer stopped");
    }
}

/// The broker-independent half of the consumer: everything between raw
/// message bytes and the routing decision.
struct Processor {
    service: Arc<OrderService>,
    retry: RetryRouter,
    dead_letter: DeadLetterRouter,
    metrics: Arc<Metrics>,
    max_attempts: u32,
}

impl Processor {
    async fn handle(&self, inbound: &Inbound<'_>) {
        let started = Instant::now();
        match self.ingest(inbound.payload).await {
            Ok(order_uid) => {
                self.metrics.record_processed(started.elapsed());
                tracing::info!(order_uid = %order_uid, "Order processed");
            }
            Err(error) => {
                self.metrics.record_failure(error.kind());
                self.escalate(inbound, &error).await;
            }
        }
    }

    async fn ingest(&self, payload: &[u8]) -> Result<String, OrderError> {
        let order: Order = serde_json::from_slice(payload)?;
        order.validate()?;
        self.service.insert_order(&order).await?;
        Ok(order.order_uid)
    }

    async fn escalate(&self, inbound: &Inbound<'_>, error: &OrderError) {
        if inbound.attempt < self.max_attempts {
            let next = inbound.attempt + 1;
            match self.retry.route(inbound, next).await {
                Ok(()) => {
                    self.metrics.record_retry_route();
                    tracing::warn!(
                        key = %inbound.key_lossy(),
                        attempt = next,
                        %error,
                        "Order routed to retry"
                    );
                }
                Err(publish_error) => tracing::error!(
                    key = %inbound.key_lossy(),
                    %error,
                    %publish_error,
                    "Retry publish failed, message dropped"
                ),
            }
        } else {
            match self.dead_letter.route(inbound, error).await {
                Ok(()) => {
                    self.metrics.record_dlq_route();
                    tracing::error!(
                        key = %inbound.key_lossy(),
                        attempt = inbound.attempt,
                        %error,
                        "Order routed to dead-letter queue"
                    );
                }
                Err(publish_error) => tracing::error!(
                    key = %inbound.key_lossy(),
                    %error,
                    %publish_error,
                    "Dead-letter publish failed, message dropped"
                ),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rdkafka::message::OwnedHeaders;

    use crate::cache::MemoryCache;
    use crate::domain::test_order;
    use crate::messaging::envelope::stamp_attempt;
    use crate::messaging::RecordingPublisher;
    use crate::storage::MemoryStore;

    fn processor(max_attempts: u32) -> (Processor, Arc<MemoryStore>, Arc<RecordingPublisher>) {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let service = Arc::new(OrderService::new(
            store.clone(),
            Arc::new(MemoryCache::new()),
            Duration::from_secs(60),
        ));
        let processor = Processor {
            service,
            retry: RetryRouter::new(publisher.clone(), "retry".to_string()),
            dead_letter: DeadLetterRouter::new(publisher.clone(), "orders_dlq".to_string()),
            metrics: Arc::new(Metrics::new().unwrap()),
            max_attempts,
        };
        (processor, store, publisher)
    }

    fn inbound(payload: &[u8], attempt: u32) -> Inbound<'_> {
        let headers = (attempt > 0).then(|| stamp_attempt::<OwnedHeaders>(None, attempt));
        Inbound {
            topic: "orders",
            key: b"order-key",
            payload,
            attempt,
            headers,
        }
    }

    #[tokio::test]
    async fn test_valid_order_is_persisted() {
        let (processor, store, publisher) = processor(3);
        let payload = serde_json::to_vec(&test_order("ok-1")).unwrap();

        processor.handle(&inbound(&payload, 0)).await;

        assert_eq!(store.order_count(), 1);
        assert!(publisher.messages().is_empty());
        assert_eq!(processor.metrics.orders_processed.get(), 1);
        assert_eq!(processor.metrics.processing_duration.get_sample_count(), 1);
    }

    #[tokio::test]
    async fn test_first_failure_goes_to_retry_with_attempt_one() {
        let (processor, store, publisher) = processor(3);

        processor.handle(&inbound(b"not json at all", 0)).await;

        assert_eq!(store.order_count(), 0);
        let sent = publisher.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "retry");
        assert_eq!(sent[0].header("retry"), Some(b"1".as_slice()));
        assert_eq!(sent[0].payload, b"not json at all");
        assert_eq!(
            processor.metrics.orders_failed.with_label_values(&["decode"]).get(),
            1
        );
        assert_eq!(processor.metrics.orders_retried.get(), 1);
    }

    #[tokio::test]
    async fn test_attempt_two_failure_routes_with_counter_three() {
        let (processor, store, publisher) = processor(3);
        store.fail_inserts(true);
        let payload = serde_json::to_vec(&test_order("retry-2")).unwrap();

        processor.handle(&inbound(&payload, 2)).await;

        let sent = publisher.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "retry");
        assert_eq!(sent[0].header("retry"), Some(b"3".as_slice()));
        assert_eq!(sent[0].payload, payload);
    }

    #[tokio::test]
    async fn test_exhausted_message_is_dead_lettered() {
        let (processor, store, publisher) = processor(3);
        store.fail_inserts(true);
        let payload = serde_json::to_vec(&test_order("dead-1")).unwrap();

        processor.handle(&inbound(&payload, 3)).await;

        let sent = publisher.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "orders_dlq");
        assert_eq!(sent[0].header("error_type"), Some(b"persistence".as_slice()));
        assert!(!sent[0].header("error_message").unwrap().is_empty());
        assert_eq!(sent[0].payload, payload);
        assert_eq!(processor.metrics.orders_dead_lettered.get(), 1);
        assert_eq!(processor.metrics.orders_retried.get(), 0);
    }

    #[tokio::test]
    async fn test_attempt_beyond_ceiling_also_dead_letters() {
        let (processor, _, publisher) = processor(3);

        processor.handle(&inbound(b"garbage", 5)).await;

        let sent = publisher.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "orders_dlq");
        assert_eq!(sent[0].header("error_type"), Some(b"decode".as_slice()));
    }

    #[tokio::test]
    async fn test_validation_failure_is_classified() {
        let (processor, store, publisher) = processor(3);
        let mut order = test_order("bad-1");
        order.items.clear();
        let payload = serde_json::to_vec(&order).unwrap();

        processor.handle(&inbound(&payload, 3)).await;

        assert_eq!(store.order_count(), 0);
        let sent = publisher.messages();
        assert_eq!(sent[0].header("error_type"), Some(b"validation".as_slice()));
        assert_eq!(
            processor
                .metrics
                .orders_failed
                .with_label_values(&["validation"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_redelivery_escalates_as_persistence() {
        let (processor, store, publisher) = processor(3);
        let payload = serde_json::to_vec(&test_order("dup-1")).unwrap();

        processor.handle(&inbound(&payload, 0)).await;
        processor.handle(&inbound(&payload, 0)).await;

        assert_eq!(store.order_count(), 1);
        let sent = publisher.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "retry");
        assert_eq!(
            processor
                .metrics
                .orders_failed
                .with_label_values(&["persistence"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_escalation_publish_failure_is_swallowed() {
        let (processor, store, publisher) = processor(3);
        publisher.fail(true);

        processor.handle(&inbound(b"not json", 0)).await;

        assert_eq!(store.order_count(), 0);
        assert!(publisher.messages().is_empty());
        // The failure was still counted even though routing failed.
        assert_eq!(
            processor.metrics.orders_failed.with_label_values(&["decode"]).get(),
            1
        );
        assert_eq!(processor.metrics.orders_retried.get(), 0);
    }
}
