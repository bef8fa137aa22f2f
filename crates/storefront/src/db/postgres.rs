//! `PostgreSQL` implementation of the banner store.
//!
//! Queries use sqlx's runtime API with explicit row structs; enum columns are
//! stored as text and parsed through the core enums, so an unknown value in
//! the database surfaces as `DataCorruption` instead of a silent default.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use plp_banners_core::{
    BannerId, BannerStatus, Placement, PlacementKind, ShopDomain, ShopId, TargetKind,
    TargetingRule, TileSize, TrackEvent,
};

use super::{BannerStore, RepositoryError};
use crate::models::{Banner, DailyTotals, Shop};

/// Banner store backed by the shared `PostgreSQL` database.
#[derive(Clone)]
pub struct PgBannerStore {
    pool: PgPool,
}

impl PgBannerStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ShopRow {
    id: i32,
    domain: String,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct BannerRow {
    id: i32,
    shop_id: i32,
    status: String,
    priority: i32,
    title: Option<String>,
    subtitle: Option<String>,
    desktop_image_url: Option<String>,
    mobile_image_url: Option<String>,
    background_color: Option<String>,
    cta_text: Option<String>,
    cta_link: Option<String>,
    open_in_new_tab: bool,
    tile_size: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct PlacementRow {
    banner_id: i32,
    placement_type: String,
    position: i32,
}

#[derive(sqlx::FromRow)]
struct TargetingRuleRow {
    banner_id: i32,
    target_type: String,
    value: String,
}

#[async_trait]
impl BannerStore for PgBannerStore {
    async fn shop_by_domain(&self, domain: &ShopDomain) -> Result<Option<Shop>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(
            r"
            SELECT id, domain, name, created_at
            FROM shops
            WHERE domain = $1
            ",
        )
        .bind(domain.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(shop_from_row).transpose()
    }

    async fn active_banners(
        &self,
        shop_id: ShopId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Banner>, RepositoryError> {
        let rows = sqlx::query_as::<_, BannerRow>(
            r"
            SELECT id, shop_id, status, priority, title, subtitle,
                   desktop_image_url, mobile_image_url, background_color,
                   cta_text, cta_link, open_in_new_tab, tile_size,
                   start_date, end_date
            FROM banners
            WHERE shop_id = $1
              AND status = 'ACTIVE'
              AND (start_date IS NULL OR start_date <= $2)
              AND (end_date IS NULL OR end_date > $2)
            ORDER BY priority DESC, id ASC
            ",
        )
        .bind(shop_id.as_i32())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let banner_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

        let placement_rows = sqlx::query_as::<_, PlacementRow>(
            r"
            SELECT banner_id, placement_type, position
            FROM banner_placements
            WHERE banner_id = ANY($1)
            ORDER BY id ASC
            ",
        )
        .bind(&banner_ids)
        .fetch_all(&self.pool)
        .await?;

        let rule_rows = sqlx::query_as::<_, TargetingRuleRow>(
            r"
            SELECT banner_id, target_type, value
            FROM banner_targeting_rules
            WHERE banner_id = ANY($1)
            ORDER BY id ASC
            ",
        )
        .bind(&banner_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut banners = Vec::with_capacity(rows.len());
        for row in rows {
            let banner_id = row.id;
            let placements = placement_rows
                .iter()
                .filter(|p| p.banner_id == banner_id)
                .map(placement_from_row)
                .collect::<Result<Vec<_>, _>>()?;
            let targeting_rules = rule_rows
                .iter()
                .filter(|r| r.banner_id == banner_id)
                .map(rule_from_row)
                .collect::<Result<Vec<_>, _>>()?;

            banners.push(banner_from_row(row, placements, targeting_rules)?);
        }

        Ok(banners)
    }

    async fn banner_belongs_to_shop(
        &self,
        banner_id: BannerId,
        shop_id: ShopId,
    ) -> Result<bool, RepositoryError> {
        let exists: Option<(i32,)> = sqlx::query_as(
            r"
            SELECT 1
            FROM banners
            WHERE id = $1 AND shop_id = $2
            ",
        )
        .bind(banner_id.as_i32())
        .bind(shop_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(exists.is_some())
    }

    async fn record_event(
        &self,
        banner_id: BannerId,
        date: NaiveDate,
        event: TrackEvent,
    ) -> Result<(), RepositoryError> {
        // Single atomic increment-with-default; never read-then-write.
        let query = match event {
            TrackEvent::Impression => {
                r"
                INSERT INTO banner_analytics_daily (banner_id, date, impressions, clicks)
                VALUES ($1, $2, 1, 0)
                ON CONFLICT (banner_id, date)
                DO UPDATE SET impressions = banner_analytics_daily.impressions + 1
                "
            }
            TrackEvent::Click => {
                r"
                INSERT INTO banner_analytics_daily (banner_id, date, impressions, clicks)
                VALUES ($1, $2, 0, 1)
                ON CONFLICT (banner_id, date)
                DO UPDATE SET clicks = banner_analytics_daily.clicks + 1
                "
            }
        };

        sqlx::query(query)
            .bind(banner_id.as_i32())
            .bind(date)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn daily_totals(
        &self,
        banner_id: BannerId,
        date: NaiveDate,
    ) -> Result<DailyTotals, RepositoryError> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            r"
            SELECT impressions, clicks
            FROM banner_analytics_daily
            WHERE banner_id = $1 AND date = $2
            ",
        )
        .bind(banner_id.as_i32())
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map_or_else(DailyTotals::default, |(impressions, clicks)| DailyTotals {
            impressions,
            clicks,
        }))
    }
}

fn shop_from_row(row: ShopRow) -> Result<Shop, RepositoryError> {
    let domain = ShopDomain::parse(&row.domain).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid shop domain in database: {e}"))
    })?;

    Ok(Shop {
        id: ShopId::new(row.id),
        domain,
        name: row.name,
        created_at: row.created_at,
    })
}

fn banner_from_row(
    row: BannerRow,
    placements: Vec<Placement>,
    targeting_rules: Vec<TargetingRule>,
) -> Result<Banner, RepositoryError> {
    let status: BannerStatus = row
        .status
        .parse()
        .map_err(RepositoryError::DataCorruption)?;
    let tile_size: TileSize = row
        .tile_size
        .parse()
        .map_err(RepositoryError::DataCorruption)?;

    Ok(Banner {
        id: BannerId::new(row.id),
        shop_id: ShopId::new(row.shop_id),
        status,
        priority: row.priority,
        title: row.title,
        subtitle: row.subtitle,
        desktop_image_url: row.desktop_image_url,
        mobile_image_url: row.mobile_image_url,
        background_color: row.background_color,
        cta_text: row.cta_text,
        cta_link: row.cta_link,
        open_in_new_tab: row.open_in_new_tab,
        tile_size,
        start_date: row.start_date,
        end_date: row.end_date,
        placements,
        targeting_rules,
    })
}

fn placement_from_row(row: &PlacementRow) -> Result<Placement, RepositoryError> {
    let kind: PlacementKind = row
        .placement_type
        .parse()
        .map_err(RepositoryError::DataCorruption)?;
    let position = u32::try_from(row.position).map_err(|_| {
        RepositoryError::DataCorruption(format!(
            "negative placement position in database: {}",
            row.position
        ))
    })?;

    Ok(Placement { kind, position })
}

fn rule_from_row(row: &TargetingRuleRow) -> Result<TargetingRule, RepositoryError> {
    let kind: TargetKind = row
        .target_type
        .parse()
        .map_err(RepositoryError::DataCorruption)?;

    Ok(TargetingRule {
        kind,
        value: row.value.clone(),
    })
}
