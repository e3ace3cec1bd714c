pub mod backoff;
pub mod breaker;

pub use backoff::BackoffPolicy;
pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
