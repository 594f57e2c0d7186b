//! Pacing between provider fetches.

use std::time::Duration;

use tokio::time::Instant;

/// Minimum-interval pacer for the sequential symbol loop. One instance per
/// provider; the first acquisition never waits.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Waits until at least `min_interval` has passed since the previous
    /// acquisition, then records the new one.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
