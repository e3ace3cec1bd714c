use std::time::Duration;

// ============================================================================
// Exponential Backoff Policy
// ============================================================================
//
// Computes the delay before a message's next processing attempt. Unlike an
// in-process retry loop, the attempt number arrives on the message itself,
// so the policy is a pure function of it: base * 2^(attempt-1), capped.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound for any computed delay.
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay for the given attempt number (1-based). Attempt 0 is treated
    /// as 1 so a missing counter still waits the base delay.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Cap the exponent; beyond 2^16 the max bound always wins anyway.
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = 1u32 << exponent;
        self.base.saturating_mul(factor).min(self.max)
    }
}
