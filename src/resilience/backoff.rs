//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Growing delay between successive polls of the same resource.
///
/// Used for receipt polling only. Submissions are never repeated.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl PollBackoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms: max_ms.max(base_ms),
            attempt: 0,
        }
    }

    /// Delay to wait before the next poll.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        calculate_backoff(self.attempt, self.base_ms, self.max_ms)
    }

    /// Number of delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000);
        assert!(max.as_millis() < 1100);
    }

    #[test]
    fn test_zero_attempt_has_no_delay() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);
    }

    #[test]
    fn test_poll_backoff_grows_and_caps() {
        let mut backoff = PollBackoff::new(100, 400);
        let delays: Vec<u128> = (0..5).map(|_| backoff.next_delay().as_millis()).collect();

        assert!(delays[0] >= 100 && delays[0] < 110);
        assert!(delays[1] >= 200 && delays[1] < 220);
        assert!(delays[2] >= 400 && delays[2] < 440);
        assert!(delays[3] >= 400 && delays[3] < 440);
        assert_eq!(backoff.attempts(), 5);
    }

    #[test]
    fn test_poll_backoff_max_below_base() {
        let mut backoff = PollBackoff::new(500, 100);
        assert!(backoff.next_delay().as_millis() >= 500);
    }
}
