use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::message::OwnedHeaders;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use crate::error::PublishError;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig};

// ============================================================================
// Message Publisher - outbound path to Kafka
// ============================================================================

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishing seam for routers, the relay and the synthetic producer.
/// Implementations must not mutate the payload.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: &[u8],
        payload: &[u8],
        headers: OwnedHeaders,
    ) -> Result<(), PublishError>;
}

/// Kafka-backed publisher. A circuit breaker in front of the producer stops
/// hammering a broker that keeps rejecting sends; while the circuit is open
/// publishes fail fast with `PublishError::CircuitOpen`.
pub struct KafkaPublisher {
    producer: FutureProducer,
    breaker: CircuitBreaker,
}

impl KafkaPublisher {
    pub fn new(brokers: &str) -> Result<Self, PublishError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()?;

        tracing::info!(brokers = %brokers, "📡 Kafka producer created");

        Ok(Self {
            producer,
            breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
        })
    }
}

#[async_trait]
impl MessagePublisher for KafkaPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &[u8],
        payload: &[u8],
        headers: OwnedHeaders,
    ) -> Result<(), PublishError> {
        if !self.breaker.allow().await {
            return Err(PublishError::CircuitOpen);
        }

        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload)
            .headers(headers);

        match self.producer.send(record, Timeout::After(SEND_TIMEOUT)).await {
            Ok(_) => {
                self.breaker.on_success().await;
                tracing::debug!(topic, "Message published");
                Ok(())
            }
            Err((error, _)) => {
                self.breaker.on_failure().await;
                tracing::error!(topic, %error, "Publish failed");
                Err(PublishError::Kafka(error))
            }
        }
    }
}
