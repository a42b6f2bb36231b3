// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::SpotifyError;
use std::time::Duration;
use tracing::warn;

/// Bounded retry schedule for catalog requests.
///
/// Rate-limit responses wait for the advertised `Retry-After` plus padding,
/// unless the server asks for longer than `max_retry_after`. Transient
/// failures wait a fixed backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub transient_backoff: Duration,
    pub default_retry_after: Duration,
    pub retry_after_padding: Duration,
    /// Longest advertised wait still honored. Anything above gives up.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transient_backoff: Duration::from_secs(1),
            default_retry_after: Duration::from_secs(5),
            retry_after_padding: Duration::from_secs(1),
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the next attempt, or `None` when the error should be returned.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    pub fn delay_for(&self, error: &SpotifyError, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts || !error.is_retryable() {
            return None;
        }

        match error {
            SpotifyError::RateLimited { retry_after } if *retry_after > self.max_retry_after => {
                warn!(
                    target: "spotify",
                    retry_after_secs = retry_after.as_secs(),
                    max_secs = self.max_retry_after.as_secs(),
                    "advertised Retry-After too long, giving up"
                );
                None
            }
            SpotifyError::RateLimited { retry_after } => {
                Some(retry_after.saturating_add(self.retry_after_padding))
            }
            _ => Some(self.transient_backoff),
        }
    }
}
