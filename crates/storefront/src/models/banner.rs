//! Banner model with placements and targeting rules.

use chrono::{DateTime, Utc};
use plp_banners_core::{BannerId, BannerStatus, Placement, ShopId, TargetingRule, TileSize};

/// A promotional banner with its placements and targeting rules attached.
///
/// The edge treats this as read-only; all mutation happens in the admin app.
#[derive(Debug, Clone)]
pub struct Banner {
    pub id: BannerId,
    pub shop_id: ShopId,
    pub status: BannerStatus,
    /// Higher priority wins when banners compete; ties keep insertion order.
    pub priority: i32,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub desktop_image_url: Option<String>,
    pub mobile_image_url: Option<String>,
    pub background_color: Option<String>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub open_in_new_tab: bool,
    pub tile_size: TileSize,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub placements: Vec<Placement>,
    pub targeting_rules: Vec<TargetingRule>,
}

impl Banner {
    /// Whether the banner is live at `now`.
    ///
    /// Status transitions run on an external timer, so `status == Active` is
    /// never trusted on its own: the date window is always re-checked at read
    /// time.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.status == BannerStatus::Active
            && self.start_date.is_none_or(|start| start <= now)
            && self.end_date.is_none_or(|end| end > now)
    }
}

/// Per-banner per-day impression and click totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyTotals {
    pub impressions: i64,
    pub clicks: i64,
}
