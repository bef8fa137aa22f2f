//! Process-local fixed-window counters.
//!
//! This is the fallback path when the shared Redis counter store is
//! unreachable. It keeps the same fixed-window semantics but only counts
//! requests seen by this instance, so it gives no global guarantee behind a
//! load balancer. Availability beats strictness here: a Redis outage must
//! never take the storefront down with it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::RateLimitDecision;

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// In-memory fixed-window counter map.
///
/// Counters are created on first request, reset when their window expires,
/// and garbage collected by [`sweep`](Self::sweep) once long idle.
#[derive(Debug, Default)]
pub struct LocalWindows {
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl LocalWindows {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against `identifier`'s current window.
    ///
    /// The whole read-modify-write happens under one lock acquisition, so
    /// concurrent requests on the same key cannot lose updates.
    pub fn check(
        &self,
        identifier: &str,
        window: Duration,
        max_requests: u32,
    ) -> RateLimitDecision {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let entry = entries
            .entry(identifier.to_owned())
            .and_modify(|e| {
                if now.duration_since(e.window_start) > window {
                    // Window expired: start a fresh one
                    e.count = 1;
                    e.window_start = now;
                } else {
                    e.count = e.count.saturating_add(1);
                }
            })
            .or_insert(WindowEntry {
                count: 1,
                window_start: now,
            });

        if entry.count > max_requests {
            RateLimitDecision {
                limited: true,
                remaining: 0,
            }
        } else {
            RateLimitDecision {
                limited: false,
                remaining: max_requests - entry.count,
            }
        }
    }

    /// Evict entries whose window expired longer than `idle_for` ago.
    ///
    /// Returns the number of evicted entries.
    pub fn sweep(&self, idle_for: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let before = entries.len();
        entries.retain(|_, e| now.duration_since(e.window_start) <= idle_for);
        before - entries.len()
    }

    /// Number of live counters (for logging and tests).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
