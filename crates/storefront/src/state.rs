//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use plp_banners_core::{ShopDomain, TargetingContext};

use crate::config::StorefrontConfig;
use crate::db::BannerStore;
use crate::models::Banner;
use crate::ratelimit::{CounterError, RateLimiter};
use crate::signature::ProxySignatureVerifier;

/// Public cache lifetime advertised on banner-fetch responses. The selection
/// cache uses the same TTL so a cached selection is never older than what the
/// client is told to cache.
pub const CACHE_MAX_AGE: Duration = Duration::from_secs(60);

/// Stale-while-revalidate window advertised alongside `max-age`.
pub const CACHE_STALE_WHILE_REVALIDATE: Duration = Duration::from_secs(120);

/// Cache key for a banner selection.
pub type SelectionKey = (ShopDomain, TargetingContext);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the banner store, rate limiter, and signature
/// verifier.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn BannerStore>,
    limiter: RateLimiter,
    verifier: ProxySignatureVerifier,
    selection_cache: Cache<SelectionKey, Arc<Vec<Banner>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured Redis URL cannot be parsed.
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn BannerStore>,
    ) -> Result<Self, CounterError> {
        let limiter = RateLimiter::new(config.redis_url.as_deref(), config.rate_limits.window)?;
        let verifier = ProxySignatureVerifier::new(config.api_secret.clone());
        let selection_cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(CACHE_MAX_AGE)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                limiter,
                verifier,
                selection_cache,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the banner store.
    #[must_use]
    pub fn store(&self) -> &dyn BannerStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the rate limiter.
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    /// Get a reference to the App Proxy signature verifier.
    #[must_use]
    pub fn verifier(&self) -> &ProxySignatureVerifier {
        &self.inner.verifier
    }

    /// Get a reference to the banner selection cache.
    #[must_use]
    pub fn selection_cache(&self) -> &Cache<SelectionKey, Arc<Vec<Banner>>> {
        &self.inner.selection_cache
    }
}
