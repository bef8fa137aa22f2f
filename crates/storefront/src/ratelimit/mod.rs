//! Distributed fixed-window rate limiting with transparent local fallback.
//!
//! The primary store is Redis, shared by every storefront instance. When it
//! is unreachable for any reason (connect failure, timeout, protocol error)
//! the limiter degrades to a per-instance in-memory window with identical
//! semantics rather than failing the request. Degraded mode is logged and
//! carries no cross-instance guarantee; it exists purely to preserve
//! availability during a counter-store outage.
//!
//! The limiter is an explicit component owned by application state, never
//! module-level global state, so each test constructs its own with isolated
//! counters.

mod local;
mod redis;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub use local::LocalWindows;
pub use redis::{CounterError, RedisCounter};

/// How often the background sweep runs over the local fallback map.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Local entries idle longer than this multiple of the default window are
/// evicted by the sweep.
const SWEEP_IDLE_WINDOWS: u32 = 5;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub limited: bool,
    pub remaining: u32,
}

struct Inner {
    shared: Option<RedisCounter>,
    local: LocalWindows,
    default_window: Duration,
    /// Set on first degradation so the WARN fires once per outage, not per
    /// request.
    degraded: AtomicBool,
    sweeper: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// Fixed-window rate limiter: shared Redis counters with a process-local
/// fallback.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    /// Create a limiter.
    ///
    /// `redis_url: None` skips the shared store entirely (single-instance
    /// deployments and tests); the limiter then always uses local counters.
    ///
    /// # Errors
    ///
    /// Returns `CounterError::Redis` if the Redis URL cannot be parsed.
    /// Connection problems are not errors here; connecting is lazy.
    pub fn new(redis_url: Option<&str>, default_window: Duration) -> Result<Self, CounterError> {
        let shared = match redis_url {
            Some(url) => Some(RedisCounter::new(url)?),
            None => None,
        };

        let limiter = Self {
            inner: Arc::new(Inner {
                shared,
                local: LocalWindows::new(),
                default_window,
                degraded: AtomicBool::new(false),
                sweeper: std::sync::Mutex::new(None),
            }),
        };
        limiter.spawn_sweeper();
        Ok(limiter)
    }

    /// Check whether a request under `identifier` is admitted.
    ///
    /// Never returns an error: a broken counter store degrades to the local
    /// fallback, so the only outcomes are admitted or limited.
    pub async fn check(
        &self,
        identifier: &str,
        window: Duration,
        max_requests: u32,
    ) -> RateLimitDecision {
        if let Some(shared) = &self.inner.shared {
            let key = format!("ratelimit:{identifier}");
            match shared.incr_window(&key, window).await {
                Ok(count) => {
                    self.note_recovered();
                    return decision_from_count(count, max_requests);
                }
                Err(e) => self.note_degraded(&e),
            }
        }

        self.inner.local.check(identifier, window, max_requests)
    }

    /// Number of live local fallback counters (for tests and diagnostics).
    #[must_use]
    pub fn local_counters(&self) -> usize {
        self.inner.local.len()
    }

    fn note_degraded(&self, error: &CounterError) {
        if !self.inner.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                error = %error,
                "Rate limiter degraded to process-local counters; \
                 limits are per-instance until the counter store recovers"
            );
        }
    }

    fn note_recovered(&self) {
        if self.inner.degraded.swap(false, Ordering::Relaxed) {
            tracing::info!("Rate limiter recovered, shared counters back in use");
        }
    }

    /// Start the periodic sweep over the local fallback map.
    ///
    /// The task is owned by this instance and aborted when the last clone is
    /// dropped, so tests never leak sweepers into each other.
    fn spawn_sweeper(&self) {
        let idle_for = self.inner.default_window * SWEEP_IDLE_WINDOWS;
        let weak = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(SWEEP_INTERVAL);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let evicted = inner.local.sweep(idle_for);
                if evicted > 0 {
                    tracing::debug!(evicted, "Swept idle rate-limit counters");
                }
            }
        });

        if let Ok(mut sweeper) = self.inner.sweeper.lock() {
            *sweeper = Some(handle);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut sweeper) = self.sweeper.lock()
            && let Some(handle) = sweeper.take()
        {
            handle.abort();
        }
    }
}

fn decision_from_count(count: i64, max_requests: u32) -> RateLimitDecision {
    let max = i64::from(max_requests);
    if count > max {
        RateLimitDecision {
            limited: true,
            remaining: 0,
        }
    } else {
        RateLimitDecision {
            limited: false,
            remaining: u32::try_from(max - count).unwrap_or(0),
        }
    }
}
