use crate::domain::ValidationError;

// ============================================================================
// Error Types
// ============================================================================
//
// Each infrastructure seam owns a small error enum; `OrderError` is the
// processing-level sum of them. Its `kind()` string is what the retry and
// dead-letter paths stamp onto message headers and what failure metrics use
// as their reason label, so the set of values is part of the wire contract.
//
// Cache errors are deliberately absent from `OrderError`: the cache is a
// read-through accelerator and its failures are logged, never propagated.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),

    #[error("cache command failed: {0}")]
    Command(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("order not found")]
    NotFound,

    #[error("order already exists")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("kafka publish failed: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("publisher circuit is open")]
    CircuitOpen,
}

/// Everything that can go wrong while ingesting or looking up an order.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("failed to decode order: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid order: {0}")]
    Validation(#[from] ValidationError),

    #[error("order not found: {0}")]
    NotFound(String),

    #[error("failed to persist order: {0}")]
    Persistence(#[from] StoreError),
}

impl OrderError {
    /// Stable tag for headers and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::Decode(_) => "decode",
            OrderError::Validation(_) => "validation",
            OrderError::NotFound(_) => "not_found",
            OrderError::Persistence(_) => "persistence",
        }
    }
}
