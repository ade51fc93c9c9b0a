//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap RPC calls with a per-request timeout
//! - Track the overall deadline of a receipt wait
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::IntoFuture;
use std::time::Duration;
use tokio::time::Instant;

/// Marker error for an elapsed timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

/// Await `fut`, giving up after `limit`.
pub async fn with_timeout<F>(limit: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: IntoFuture,
{
    tokio::time::timeout(limit, fut).await.map_err(|_| Elapsed)
}

/// Fixed point in time after which a wait is abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    expires: Instant,
}

impl Deadline {
    pub fn after(limit: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            expires: started + limit,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.expires.saturating_duration_since(Instant::now())
    }

    /// Clamp a delay so it never sleeps past the deadline.
    pub fn clamp(&self, delay: Duration) -> Duration {
        delay.min(self.remaining())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let result = with_timeout(Duration::from_secs(1), async { 5 }).await;
        assert_eq!(result, Ok(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_elapses() {
        let result = with_timeout(
            Duration::from_millis(50),
            tokio::time::sleep(Duration::from_secs(10)),
        )
        .await;
        assert_eq!(result, Err(Elapsed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_clamps_and_expires() {
        let deadline = Deadline::after(Duration::from_millis(300));
        assert!(!deadline.is_expired());
        assert_eq!(deadline.clamp(Duration::from_secs(5)), Duration::from_millis(300));

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(deadline.remaining(), Duration::from_millis(100));

        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(deadline.is_expired());
        assert_eq!(deadline.clamp(Duration::from_millis(10)), Duration::ZERO);
        assert!(deadline.elapsed() >= Duration::from_millis(350));
    }
}
