use std::sync::Arc;

use super::envelope::{stamp_attempt, with_error, Inbound};
use super::producer::MessagePublisher;
use crate::error::{OrderError, PublishError};

// ============================================================================
// Failure Routing - retry and dead-letter forwarding
// ============================================================================
//
// Both routers forward the message body byte-for-byte and only rewrite
// headers: the retry router stamps the next attempt number, the dead-letter
// router attaches the failure classification. Neither decides escalation;
// that is the consumer's call.
// ============================================================================

/// Forwards a failed message to the retry stream with the attempt counter
/// stamped to the caller-chosen value.
pub struct RetryRouter {
    publisher: Arc<dyn MessagePublisher>,
    topic: String,
}

impl RetryRouter {
    pub fn new(publisher: Arc<dyn MessagePublisher>, topic: String) -> Self {
        Self { publisher, topic }
    }

    pub async fn route(&self, inbound: &Inbound<'_>, attempt: u32) -> Result<(), PublishError> {
        let headers = stamp_attempt(inbound.headers.as_ref(), attempt);
        self.publisher
            .publish(&self.topic, inbound.key, inbound.payload, headers)
            .await
    }
}

/// Forwards an exhausted message to the dead-letter stream, annotated with
/// what failed and why.
pub struct DeadLetterRouter {
    publisher: Arc<dyn MessagePublisher>,
    topic: String,
}

impl DeadLetterRouter {
    pub fn new(publisher: Arc<dyn MessagePublisher>, topic: String) -> Self {
        Self { publisher, topic }
    }

    pub async fn route(&self, inbound: &Inbound<'_>, error: &OrderError) -> Result<(), PublishError> {
        let headers = with_error(inbound.headers.as_ref(), error.kind(), &error.to_string());
        self.publisher
            .publish(&self.topic, inbound.key, inbound.payload, headers)
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
