//! Database operations for the storefront edge.
//!
//! # Database: `plp_banners`
//!
//! The edge reads rows the admin CRUD application writes:
//!
//! ## Tables
//!
//! - `shops` - Merchant shops keyed by `*.myshopify.com` domain
//! - `banners` - Banner configuration, lifecycle status, schedule
//! - `banner_placements` - Grid positions per banner
//! - `banner_targeting_rules` - Context predicates per banner
//! - `banner_analytics_daily` - Per-banner per-day impression/click counters
//!
//! The edge's only write is the atomic upsert-increment on
//! `banner_analytics_daily`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p plp-banners-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use plp_banners_core::{BannerId, ShopDomain, ShopId, TrackEvent};

use crate::models::{Banner, DailyTotals, Shop};

pub use memory::MemoryBannerStore;
pub use postgres::PgBannerStore;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row held a value the domain types reject.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Read-mostly persistence boundary consumed by the edge handlers.
///
/// Production uses [`PgBannerStore`]; tests use [`MemoryBannerStore`] so the
/// full request path runs without a database.
#[async_trait]
pub trait BannerStore: Send + Sync {
    /// Look up a shop by its domain. Unknown shops are `None`, not an error.
    async fn shop_by_domain(&self, domain: &ShopDomain) -> Result<Option<Shop>, RepositoryError>;

    /// All banners for `shop_id` with `status = Active` whose start/end
    /// window contains `now`, with placements and targeting rules attached,
    /// ordered by priority descending then insertion order.
    async fn active_banners(
        &self,
        shop_id: ShopId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Banner>, RepositoryError>;

    /// Whether `banner_id` is owned by `shop_id`. Used to reject cross-shop
    /// telemetry before any counter mutation.
    async fn banner_belongs_to_shop(
        &self,
        banner_id: BannerId,
        shop_id: ShopId,
    ) -> Result<bool, RepositoryError>;

    /// Atomically increment the impression or click counter for
    /// `(banner_id, date)`, creating the row on first write.
    async fn record_event(
        &self,
        banner_id: BannerId,
        date: NaiveDate,
        event: TrackEvent,
    ) -> Result<(), RepositoryError>;

    /// Read back the daily totals for `(banner_id, date)`.
    async fn daily_totals(
        &self,
        banner_id: BannerId,
        date: NaiveDate,
    ) -> Result<DailyTotals, RepositoryError>;

    /// Readiness probe. The in-memory store is always ready.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
