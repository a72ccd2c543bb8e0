//! Exponential backoff strategy for retry policies.

use std::time::Duration;

/// Delay doubling (by default) after every attempt, plus random extra time.
///
/// Jitter is additive: a delay of `d` becomes a value in `[d, d * (1 + jitter)]`.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            initial,
            max,
            factor,
            jitter: 0.5,
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base =
            self.initial.as_millis() as f64 * self.factor.powi(attempt.saturating_sub(1) as i32);
        let clamped = base.min(self.max.as_millis() as f64);

        let jittered = if self.jitter > 0.0 {
            clamped + rand::random::<f64>() * clamped * self.jitter
        } else {
            clamped
        };

        Duration::from_millis(jittered as u64)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30), 2.0)
    }
}
