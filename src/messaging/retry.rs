use std::sync::Arc;

use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;

use super::consumer::ConsumerState;
use super::envelope::{stamp_attempt, Inbound};
use super::producer::MessagePublisher;
use crate::config::Config;
use crate::error::PublishError;
use crate::metrics::Metrics;
use crate::shutdown::ShutdownListener;
use crate::utils::BackoffPolicy;

// ============================================================================
// Retry Consumer - delayed relay back to the main stream
// ============================================================================
//
// Reads the retry topic and republishes every message to the main topic
// with the attempt counter incremented; key, payload and other headers pass
// through untouched. Each message waits out a backoff that grows with its
// attempt counter before being requeued. The relay never inspects payloads
// and has no attempt cap of its own; the ceiling is enforced where messages
// are processed.
// ============================================================================

pub struct RetryConsumer {
    consumer: StreamConsumer,
    relay: Relay,
    state: ConsumerState,
}

/// Broker-independent relay step, split out so the increment and
/// preservation rules can be tested directly.
struct Relay {
    publisher: Arc<dyn MessagePublisher>,
    main_topic: String,
    backoff: BackoffPolicy,
    metrics: Arc<Metrics>,
}

impl Relay {
    /// Republishes one message to the main stream with the counter bumped.
    /// Returns the stamped attempt number.
    async fn forward(&self, inbound: &Inbound<'_>) -> Result<u32, PublishError> {
        let next = inbound.attempt + 1;
        let headers = stamp_attempt(inbound.headers.as_ref(), next);
        self.publisher
            .publish(&self.main_topic, inbound.key, inbound.payload, headers)
            .await?;
        self.metrics.record_relay();
        Ok(next)
    }
}

impl RetryConsumer {
    pub fn connect(
        config: &Config,
        publisher: Arc<dyn MessagePublisher>,
        backoff: BackoffPolicy,
        metrics: Arc<Metrics>,
    ) -> Result<Self, KafkaError> {
        let consumer = super::subscriber(config, &config.retry_topic)?;
        Ok(Self {
            consumer,
            relay: Relay {
                publisher,
                main_topic: config.kafka_topic.clone(),
                backoff,
                metrics,
            },
            state: ConsumerState::Running,
        })
    }

    pub async fn run(mut self, mut shutdown: ShutdownListener) {
        tracing::info!("🔁 Retry relay running");

        while self.state == ConsumerState::Running {
            tokio::select! {
                _ = shutdown.stopped() => {
                    self.state = ConsumerState::Stopping;
                    tracing::info!("Retry relay stopping");
                }
                received = self.consumer.recv() => match received {
                    Ok(message) => {
                        let inbound = Inbound::from_message(&message);
                        // Delay grows with the attempt counter.
                        let delay = self.relay.backoff.delay_for(inbound.attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        match self.relay.forward(&inbound).await {
                            Ok(next) => tracing::debug!(
                                key = %inbound.key_lossy(),
                                attempt = next,
                                delay_ms = delay.as_millis() as u64,
                                "Message relayed to main stream"
                            ),
                            Err(error) => tracing::error!(
                                key = %inbound.key_lossy(),
                                %error,
                                "Relay publish failed, message dropped"
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
        tracing::info!("Retry relay stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================
