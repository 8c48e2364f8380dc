use std::time::Duration;

/// Delay before the next poll after consecutive failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Retry on the regular interval.
    #[default]
    Fixed,
    /// delay = min(interval * 2^failures, max_delay)
    Exponential { max_delay: Duration },
}

impl RetryPolicy {
    /// Delay until the next poll given the regular `interval` and the number of
    /// consecutive failures so far (0 after a success).
    pub fn next_delay(&self, interval: Duration, failures: u32) -> Duration {
        match *self {
            RetryPolicy::Fixed => interval,
            RetryPolicy::Exponential { max_delay } => {
                if failures == 0 {
                    return interval;
                }
                let factor = 2u64.saturating_pow(failures.min(63));
                let delay = (interval.as_millis() as u64).saturating_mul(factor);
                Duration::from_millis(delay.min(max_delay.as_millis() as u64)).max(interval)
            }
        }
    }
}
