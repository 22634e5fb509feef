//! Token-bucket rate limiting for the log path
//!
//! The bucket holds up to `burst` tokens and refills at `rate` tokens per
//! second. Refill is computed lazily from elapsed time on every access; there
//! is no background timer.
//!
//! # Example
//!
//! ```
//! use alloy_telemetry::ratelimit::RateLimiter;
//!
//! let limiter = RateLimiter::new(10.0, 20);
//! assert!(limiter.try_acquire());
//!
//! limiter.set_rate_limit(5.0, 15);
//! assert_eq!(limiter.rate(), 5.0);
//! assert_eq!(limiter.burst(), 15);
//! ```

use crate::config::RateLimitConfig;
use crate::context::CallContext;
use crate::error::TelemetryError;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Bucket state, always accessed under the limiter's lock
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    rate: f64,
    burst: u32,
}

impl TokenBucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = elapsed
            .mul_add(self.rate, self.tokens)
            .min(f64::from(self.burst));
        self.last_refill = now;
    }

    /// Take one token, or report how long until one is available
    ///
    /// `Err(None)` means no token will become available with the current
    /// settings: zero rate, zero burst, or a rate so low the wait does not fit
    /// in a `Duration`.
    fn try_take(&mut self, now: Instant) -> Result<(), Option<Duration>> {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }
        if self.burst == 0 || self.rate <= 0.0 {
            return Err(None);
        }

        let missing = 1.0 - self.tokens;
        Err(Duration::try_from_secs_f64(missing / self.rate).ok())
    }
}

/// Thread-safe token-bucket admission gate
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    reconfigured: Notify,
}

impl RateLimiter {
    /// Create a limiter with a full bucket
    ///
    /// Zero values are accepted here and make every wait block until the
    /// limiter is reconfigured or the caller's context is done.
    pub fn new(rate: f64, burst: u32) -> Self {
        let rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
        Self {
            bucket: Mutex::new(TokenBucket {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
                rate,
                burst,
            }),
            reconfigured: Notify::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.rate, config.burst)
    }

    /// Consume a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.bucket.lock().try_take(Instant::now()).is_ok()
    }

    /// Wait for a token, bounded by the context's cancellation and deadline
    ///
    /// Returns immediately when a token is available. When the context is
    /// already done, or finishes before a token arrives, or the required wait
    /// would overrun its deadline, returns
    /// [`TelemetryError::RateLimitExceeded`] without consuming a token.
    pub async fn wait(&self, cx: &CallContext) -> Result<(), TelemetryError> {
        loop {
            if cx.is_done() {
                return Err(TelemetryError::RateLimitExceeded(
                    cx.done_reason().to_string(),
                ));
            }

            // Registered before checking the bucket so a concurrent
            // set_rate_limit cannot slip between the check and the wait.
            let reconfigured = self.reconfigured.notified();

            let delay = match self.bucket.lock().try_take(Instant::now()) {
                Ok(()) => return Ok(()),
                Err(delay) => delay,
            };

            match delay {
                Some(delay) => {
                    if let Some(deadline) = cx.deadline() {
                        let ready = Instant::now().checked_add(delay);
                        if ready.map_or(true, |ready| ready > deadline) {
                            return Err(TelemetryError::RateLimitExceeded(format!(
                                "wait of {:?} would exceed context deadline",
                                delay
                            )));
                        }
                    }

                    tokio::select! {
                        _ = cx.done() => {
                            return Err(TelemetryError::RateLimitExceeded(
                                cx.done_reason().to_string(),
                            ));
                        }
                        _ = tokio::time::sleep(delay) => {}
                        _ = reconfigured => {}
                    }
                }
                None => {
                    tokio::select! {
                        _ = cx.done() => {
                            return Err(TelemetryError::RateLimitExceeded(
                                cx.done_reason().to_string(),
                            ));
                        }
                        _ = reconfigured => {}
                    }
                }
            }
        }
    }

    /// Reconfigure refill rate and capacity
    ///
    /// A `rate` of zero or less, or a `burst` of zero, leaves that setting
    /// unchanged. Tokens accrued so far are kept, capped at the new capacity.
    pub fn set_rate_limit(&self, rate: f64, burst: u32) {
        {
            let mut bucket = self.bucket.lock();
            bucket.refill(Instant::now());
            if rate > 0.0 && rate.is_finite() {
                bucket.rate = rate;
            }
            if burst > 0 {
                bucket.burst = burst;
                bucket.tokens = bucket.tokens.min(f64::from(burst));
            }
        }
        self.reconfigured.notify_waiters();
    }

    /// Refill rate in tokens per second
    pub fn rate(&self) -> f64 {
        self.bucket.lock().rate
    }

    /// Bucket capacity
    pub fn burst(&self) -> u32 {
        self.bucket.lock().burst
    }

    /// Tokens currently available, after refill
    pub fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock();
        bucket.refill(Instant::now());
        bucket.tokens
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
