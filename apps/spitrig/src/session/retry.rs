use rand::Rng;
use std::time::Duration;

/// Schedules the bootstrap sequencer's next attempt.
///
/// The default never gives up and never waits between attempts. Bounded
/// counts and backoff are for tests and deployments that want them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Duration,
}

impl RetryPolicy {
    /// Retry forever, immediately.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Give up after `max_attempts` failed starts.
    pub fn limited(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::unbounded()
        }
    }

    /// Exponential backoff from `base` capped at `max`.
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    /// Adds up to `bound` of random delay on top of each backoff step.
    pub fn jitter(mut self, bound: Duration) -> Self {
        self.jitter = bound;
        self
    }

    /// Delay before the retry following failed attempt number `attempt`
    /// (1-based), or `None` once the policy is exhausted.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        let mut delay = if self.base_delay.is_zero() {
            Duration::ZERO
        } else {
            let shift = attempt.saturating_sub(1).min(16);
            let scaled = self.base_delay.saturating_mul(1 << shift);
            scaled.min(self.max_delay.max(self.base_delay))
        };

        if !self.jitter.is_zero() {
            let bound = self.jitter.as_millis() as u64;
            delay += Duration::from_millis(rand::thread_rng().gen_range(0..=bound));
        }

        Some(delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}
