use std::borrow::Cow;

use rdkafka::message::{BorrowedMessage, Header, Headers, OwnedHeaders};
use rdkafka::Message;

// ============================================================================
// Message Envelope - the header contract between pipeline stages
// ============================================================================
//
// Attempt tracking and failure classification travel in Kafka headers, not
// in the payload. The payload always stays byte-identical to what the
// producer sent.
//
//   retry          attempt counter; absent means zero
//   error_type     failure class stamped when a message is dead-lettered
//   error_message  human-readable failure detail
//
// ============================================================================

pub const RETRY_HEADER: &str = "retry";
pub const ERROR_TYPE_HEADER: &str = "error_type";
pub const ERROR_MESSAGE_HEADER: &str = "error_message";

/// One consumed message, decoupled from the broker types so processing
/// logic can be exercised without a connection.
pub struct Inbound<'a> {
    pub topic: &'a str,
    pub key: &'a [u8],
    pub payload: &'a [u8],
    /// Parsed `retry` header; zero when absent or unreadable.
    pub attempt: u32,
    pub headers: Option<OwnedHeaders>,
}

impl<'a> Inbound<'a> {
    pub fn from_message(message: &'a BorrowedMessage<'_>) -> Self {
        let headers = message.headers().map(|h| h.detach());
        Self {
            topic: message.topic(),
            key: message.key().unwrap_or_default(),
            payload: message.payload().unwrap_or_default(),
            attempt: attempt_of(headers.as_ref()),
            headers,
        }
    }

    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.key)
    }

    pub fn payload_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.payload)
    }
}

/// Reads the attempt counter. Absent, non-UTF-8 and non-numeric values all
/// count as zero so a malformed header cannot wedge a message in the retry
/// loop forever.
pub fn attempt_of<H: Headers>(headers: Option<&H>) -> u32 {
    header_value(headers, RETRY_HEADER)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .and_then(|text| text.trim().parse().ok())
        .unwrap_or(0)
}

/// Copies `headers` with the attempt counter set to `attempt`. Every other
/// header is preserved untouched.
pub fn stamp_attempt<H: Headers>(headers: Option<&H>, attempt: u32) -> OwnedHeaders {
    let value = attempt.to_string();
    copy_excluding(headers, &[RETRY_HEADER]).insert(Header {
        key: RETRY_HEADER,
        value: Some(value.as_str()),
    })
}

/// Copies `headers` with the failure classification attached, preserving
/// the attempt counter for later inspection.
pub fn with_error<H: Headers>(
    headers: Option<&H>,
    error_type: &str,
    error_message: &str,
) -> OwnedHeaders {
    copy_excluding(headers, &[ERROR_TYPE_HEADER, ERROR_MESSAGE_HEADER])
        .insert(Header {
            key: ERROR_TYPE_HEADER,
            value: Some(error_type),
        })
        .insert(Header {
            key: ERROR_MESSAGE_HEADER,
            value: Some(error_message),
        })
}

/// Header value as a lossy string, empty when the header is missing.
pub fn header_str<H: Headers>(headers: Option<&H>, key: &str) -> String {
    header_value(headers, key)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

fn header_value<'a, H: Headers>(headers: Option<&'a H>, key: &str) -> Option<&'a [u8]> {
    headers?.iter().find(|h| h.key == key).and_then(|h| h.value)
}

fn copy_excluding<H: Headers>(headers: Option<&H>, excluded: &[&str]) -> OwnedHeaders {
    let mut out = OwnedHeaders::new();
    if let Some(headers) = headers {
        for header in headers.iter() {
            if !excluded.contains(&header.key) {
                out = out.insert(header);
            }
        }
    }
    out
}

#[cfg(test)]
pub(crate) fn header_pairs(headers: &OwnedHeaders) -> Vec<(String, Vec<u8>)> {
    headers
        .iter()
        .map(|h| (h.key.to_string(), h.value.unwrap_or_default().to_vec()))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
