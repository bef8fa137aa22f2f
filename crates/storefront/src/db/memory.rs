//! In-memory implementation of the banner store.
//!
//! Used by handler tests (and local development without a database). Mirrors
//! the Postgres implementation's observable behavior: active-status plus
//! date-window filtering, priority-descending order with insertion-order
//! ties, and an atomic upsert-increment for the daily counters.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use plp_banners_core::{BannerId, ShopDomain, ShopId, TrackEvent};

use super::{BannerStore, RepositoryError};
use crate::models::{Banner, DailyTotals, Shop};

#[derive(Default)]
struct MemoryState {
    shops: Vec<Shop>,
    banners: Vec<Banner>,
    analytics: HashMap<(BannerId, NaiveDate), DailyTotals>,
}

/// Banner store held entirely in process memory.
#[derive(Default)]
pub struct MemoryBannerStore {
    state: Mutex<MemoryState>,
}

impl MemoryBannerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a shop fixture.
    pub fn add_shop(&self, shop: Shop) {
        self.lock().shops.push(shop);
    }

    /// Insert a banner fixture. Insertion order is the tie-break order the
    /// store reports for equal priorities.
    pub fn add_banner(&self, banner: Banner) {
        self.lock().banners.push(banner);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl BannerStore for MemoryBannerStore {
    async fn shop_by_domain(&self, domain: &ShopDomain) -> Result<Option<Shop>, RepositoryError> {
        Ok(self
            .lock()
            .shops
            .iter()
            .find(|s| s.domain == *domain)
            .cloned())
    }

    async fn active_banners(
        &self,
        shop_id: ShopId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Banner>, RepositoryError> {
        let mut banners: Vec<Banner> = self
            .lock()
            .banners
            .iter()
            .filter(|b| b.shop_id == shop_id && b.is_live_at(now))
            .cloned()
            .collect();

        // Stable sort keeps insertion order as the tie-break
        banners.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(banners)
    }

    async fn banner_belongs_to_shop(
        &self,
        banner_id: BannerId,
        shop_id: ShopId,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()
            .banners
            .iter()
            .any(|b| b.id == banner_id && b.shop_id == shop_id))
    }

    async fn record_event(
        &self,
        banner_id: BannerId,
        date: NaiveDate,
        event: TrackEvent,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let totals = state.analytics.entry((banner_id, date)).or_default();
        match event {
            TrackEvent::Impression => totals.impressions += 1,
            TrackEvent::Click => totals.clicks += 1,
        }
        Ok(())
    }

    async fn daily_totals(
        &self,
        banner_id: BannerId,
        date: NaiveDate,
    ) -> Result<DailyTotals, RepositoryError> {
        Ok(self
            .lock()
            .analytics
            .get(&(banner_id, date))
            .copied()
            .unwrap_or_default())
    }
}
