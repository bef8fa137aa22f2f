//! Redis-backed shared fixed-window counter.
//!
//! Multiple storefront instances share one counter per client identifier.
//! The increment and the TTL read travel in a single pipelined round trip so
//! two instances can never observe a half-updated window.
//!
//! Connection handling is deliberately pessimistic: connect lazily, give each
//! operation a short deadline, and after repeated connect failures back off
//! and stop trying for a while. Callers treat every error here as a signal to
//! fall back to the process-local counter, never as a request failure.

use std::time::{Duration, Instant};

use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use tokio::sync::Mutex;

/// Per-operation deadline. Redis is on the request path; a slow counter store
/// must degrade to the local fallback instead of stalling the request.
const OPERATION_TIMEOUT: Duration = Duration::from_millis(250);

/// Connect attempts before the store is written off until the backoff lapses.
const MAX_CONNECT_ATTEMPTS: u32 = 3;

/// Backoff cap between abandoned-connection retry windows.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Why a counter operation did not produce a count.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("redis unavailable, retry after backoff")]
    Unavailable,
    #[error("redis operation timed out")]
    Timeout,
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),
}

struct ConnState {
    manager: Option<ConnectionManager>,
    failed_attempts: u32,
    retry_after: Option<Instant>,
}

/// Shared fixed-window counter backed by Redis.
pub struct RedisCounter {
    client: Client,
    state: Mutex<ConnState>,
}

impl std::fmt::Debug for RedisCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounter").finish_non_exhaustive()
    }
}

impl RedisCounter {
    /// Create a counter for the given Redis URL. No connection is made until
    /// the first operation.
    ///
    /// # Errors
    ///
    /// Returns `RedisError` if the URL itself cannot be parsed.
    pub fn new(url: &str) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            state: Mutex::new(ConnState {
                manager: None,
                failed_attempts: 0,
                retry_after: None,
            }),
        })
    }

    /// Atomically count one request against `key`'s current window and return
    /// the resulting count.
    ///
    /// INCR and PTTL are pipelined into one round trip; if the key has no TTL
    /// yet (first request in the window) a PEXPIRE follows. Two clients racing
    /// on the first request may both send PEXPIRE, which is harmless.
    ///
    /// # Errors
    ///
    /// Any failure (connect, timeout, protocol) is returned for the caller to
    /// degrade on; this function never retries a failed increment because the
    /// caller's fallback counter already absorbed the request by then.
    pub async fn incr_window(&self, key: &str, window: Duration) -> Result<i64, CounterError> {
        let mut manager = self.connection().await?;

        let op = async {
            let (count, ttl_ms): (i64, i64) = redis::pipe()
                .cmd("INCR")
                .arg(key)
                .cmd("PTTL")
                .arg(key)
                .query_async(&mut manager)
                .await?;

            // PTTL == -1 means the key exists without an expiry: this INCR
            // created it, so the window starts now.
            if ttl_ms < 0 {
                let window_ms = i64::try_from(window.as_millis()).unwrap_or(60_000);
                let () = redis::cmd("PEXPIRE")
                    .arg(key)
                    .arg(window_ms)
                    .query_async(&mut manager)
                    .await?;
            }

            Ok::<i64, RedisError>(count)
        };

        match tokio::time::timeout(OPERATION_TIMEOUT, op).await {
            Ok(Ok(count)) => Ok(count),
            Ok(Err(e)) => {
                self.note_failure().await;
                Err(CounterError::Redis(e))
            }
            Err(_) => {
                self.note_failure().await;
                Err(CounterError::Timeout)
            }
        }
    }

    /// Get the shared connection, connecting lazily.
    ///
    /// While in a backoff window after repeated connect failures this returns
    /// `Unavailable` immediately instead of dialing again.
    async fn connection(&self) -> Result<ConnectionManager, CounterError> {
        let mut state = self.state.lock().await;

        if let Some(manager) = &state.manager {
            return Ok(manager.clone());
        }

        if let Some(retry_after) = state.retry_after
            && Instant::now() < retry_after
        {
            return Err(CounterError::Unavailable);
        }

        match tokio::time::timeout(OPERATION_TIMEOUT, ConnectionManager::new(self.client.clone()))
            .await
        {
            Ok(Ok(manager)) => {
                state.manager = Some(manager.clone());
                state.failed_attempts = 0;
                state.retry_after = None;
                tracing::info!("Connected to rate-limit counter store");
                Ok(manager)
            }
            Ok(Err(e)) => {
                Self::schedule_retry(&mut state);
                Err(CounterError::Redis(e))
            }
            Err(_) => {
                Self::schedule_retry(&mut state);
                Err(CounterError::Timeout)
            }
        }
    }

    /// Record an operation failure so the next caller reconnects.
    async fn note_failure(&self) {
        let mut state = self.state.lock().await;
        state.manager = None;
        Self::schedule_retry(&mut state);
    }

    fn schedule_retry(state: &mut ConnState) {
        state.failed_attempts = state.failed_attempts.saturating_add(1);
        if state.failed_attempts >= MAX_CONNECT_ATTEMPTS {
            let exp = state.failed_attempts.min(8);
            let backoff = BASE_BACKOFF
                .saturating_mul(1_u32 << exp)
                .min(MAX_BACKOFF);
            state.retry_after = Some(Instant::now() + backoff);
            tracing::warn!(
                attempts = state.failed_attempts,
                backoff_secs = backoff.as_secs_f64(),
                "Rate-limit counter store unreachable, backing off"
            );
        }
    }
}
