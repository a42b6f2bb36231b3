// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{sleep, Duration, Instant};

/// Spaces out calls so that at least `min_gap` passes between the end of one
/// call and the start of the next.
///
/// Holding a [`RatePermit`] serializes callers; the gap is measured from the
/// moment the permit is dropped, not from when it was handed out.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_gap: Duration,
    last_finished: Arc<Mutex<Option<Instant>>>,
}

/// Exclusive right to issue one call. Dropping it records the completion time.
#[derive(Debug)]
pub struct RatePermit {
    guard: OwnedMutexGuard<Option<Instant>>,
}

impl Drop for RatePermit {
    fn drop(&mut self) {
        *self.guard = Some(Instant::now());
    }
}

impl RateLimiter {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_finished: Arc::new(Mutex::new(None)),
        }
    }

    pub fn min_gap(&self) -> Duration {
        self.min_gap
    }

    /// Wait until the gap since the previous call has elapsed.
    pub async fn acquire(&self) -> RatePermit {
        let guard = self.last_finished.clone().lock_owned().await;

        if let Some(finished) = *guard {
            let elapsed = finished.elapsed();
            if elapsed < self.min_gap {
                let wait_time = self.min_gap - elapsed;
                tracing::trace!(target: "spotify", ?wait_time, "pacing: waiting before next call");
                sleep(wait_time).await;
            }
        }

        RatePermit { guard }
    }
}
