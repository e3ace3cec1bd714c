use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rdkafka::message::OwnedHeaders;

use super::envelope;
use super::producer::MessagePublisher;
use crate::error::PublishError;

/// Publisher double that records every publish. Flipping `fail` makes every
/// publish report an open circuit so escalation failure paths can be
/// exercised without a broker.
#[derive(Default)]
pub(crate) struct RecordingPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
    fail: AtomicBool,
}

#[derive(Debug, Clone)]
pub(crate) struct PublishedMessage {
    pub topic: String,
    pub key: Vec<u8>,
    pub payload: Vec<u8>,
    pub headers: Vec<(String, Vec<u8>)>,
}

impl PublishedMessage {
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &[u8],
        payload: &[u8],
        headers: OwnedHeaders,
    ) -> Result<(), PublishError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublishError::CircuitOpen);
        }

        self.messages.lock().unwrap().push(PublishedMessage {
            topic: topic.to_string(),
            key: key.to_vec(),
            payload: payload.to_vec(),
            headers: envelope::header_pairs(&headers),
        });
        Ok(())
    }
}
