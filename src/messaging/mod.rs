use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;

use crate::config::Config;

mod consumer;
mod dlq;
pub mod envelope;
mod producer;
#[cfg(test)]
mod recording;
mod retry;
mod routing;

pub use consumer::{ConsumerState, OrderConsumer};
pub use dlq::DeadLetterConsumer;
pub use producer::{KafkaPublisher, MessagePublisher};
#[cfg(test)]
pub(crate) use recording::RecordingPublisher;
pub use retry::RetryConsumer;
pub use routing::{DeadLetterRouter, RetryRouter};

// ============================================================================
// Messaging - Kafka consumers, publisher and failure routing
// ============================================================================
//
// Three consumer loops share the plumbing here: the order consumer ingests,
// the retry consumer relays delayed attempts back, and the dead-letter
// consumer files terminal failures. All outbound traffic goes through the
// `MessagePublisher` seam so routing logic stays testable without a broker.
// ============================================================================

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds a subscribed consumer, failing fast when the broker is not
/// reachable. All consumers share one group id; partitions of each topic
/// are balanced across instances.
pub(crate) fn subscriber(config: &Config, topic: &str) -> Result<StreamConsumer, KafkaError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.kafka_brokers)
        .set("group.id", &config.kafka_group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()?;

    consumer.fetch_metadata(Some(topic), STARTUP_TIMEOUT)?;
    consumer.subscribe(&[topic])?;
    tracing::debug!(topic, group = %config.kafka_group_id, "Subscribed");
    Ok(consumer)
}
