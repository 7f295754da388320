//! Retry with exponential backoff
//!
//! Wraps a single provider call. Throttled calls are retried in place with a
//! delay that starts at `min`, doubles after every throttle and never exceeds
//! `max`. Any other error is returned immediately. A success resets the delay,
//! so a later throttling burst starts again from `min`.
//!
//! There is no retry count. The only bound on waiting is the optional
//! `max_wait` budget, which applies to each call on its own and is renewed by
//! every success. Without it a permanently throttled endpoint is retried
//! forever, and callers are expected to put their own timeout around the run.

use crate::error::ApiError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Initial delay after the first throttled response
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(10);

/// Delay multiplier applied after each throttled response
pub const BACKOFF_FACTOR: u32 = 2;

/// Backoff parameters for one call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    pub min: Duration,
    pub max: Duration,
    /// Time one call may spend sleeping on throttles before giving up;
    /// a success starts the next call with a fresh budget
    pub max_wait: Option<Duration>,
}

impl BackoffConfig {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
            max_wait: None,
        }
    }

    /// Default minimum delay with a provider-specific cap
    pub fn with_cap(max: Duration) -> Self {
        Self::new(DEFAULT_MIN_DELAY, max)
    }

    pub fn max_wait(mut self, budget: Option<Duration>) -> Self {
        self.max_wait = budget;
        self
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::with_cap(Duration::from_secs(1))
    }
}

/// Capped exponential delay sequence, no jitter
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            current: config.min,
        }
    }

    /// Delay to sleep now; advances the sequence
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .saturating_mul(BACKOFF_FACTOR)
            .min(self.config.max);
        delay
    }

    /// Delay the next throttle would sleep for
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.config.min;
    }
}

/// Stateful retry wrapper, one per logical call site
#[derive(Debug, Clone)]
pub struct Retrier {
    backoff: Backoff,
    max_wait: Option<Duration>,
    waited: Duration,
    throttled: u64,
}

impl Retrier {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            backoff: Backoff::new(config),
            max_wait: config.max_wait,
            waited: Duration::ZERO,
            throttled: 0,
        }
    }

    /// Run `op` until it succeeds or fails with a non-throttling error
    pub async fn call<T, F, Fut>(&mut self, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        loop {
            match op().await {
                Ok(value) => {
                    self.backoff.reset();
                    self.waited = Duration::ZERO;
                    return Ok(value);
                }
                Err(err) if err.is_throttled() => {
                    let delay = self.backoff.next_delay();

                    if let Some(budget) = self.max_wait {
                        if self.waited + delay > budget {
                            tracing::warn!(
                                "Throttling budget of {:?} spent after {} retries",
                                budget,
                                self.throttled
                            );
                            return Err(ApiError::DeadlineExceeded(Box::new(err)));
                        }
                    }

                    tracing::warn!("Throttled ({}), retrying in {:?}", err, delay);
                    let started = Instant::now();
                    tokio::time::sleep(delay).await;
                    self.waited += started.elapsed();
                    self.throttled += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Number of throttled responses seen so far
    pub fn throttled(&self) -> u64 {
        self.throttled
    }

    /// Delay the next throttle would sleep for
    pub fn current_delay(&self) -> Duration {
        self.backoff.current()
    }
}
