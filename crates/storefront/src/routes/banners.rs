//! Public banner-fetch endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::{RawQuery, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;

use plp_banners_core::{BannerId, Placement, TargetingContext, TileSize};

use crate::error::{AppError, Result};
use crate::middleware::client_identifier;
use crate::models::Banner;
use crate::selector::select_active_banners;
use crate::state::{AppState, CACHE_MAX_AGE, CACHE_STALE_WHILE_REVALIDATE};

/// Banner shape exposed to the storefront. Everything internal (shop id,
/// status, date window, targeting rules) stays server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerView {
    pub id: BannerId,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub desktop_image_url: Option<String>,
    pub mobile_image_url: Option<String>,
    pub background_color: Option<String>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub open_in_new_tab: bool,
    pub tile_size: TileSize,
    pub priority: i32,
    pub placements: Vec<Placement>,
}

impl From<&Banner> for BannerView {
    fn from(banner: &Banner) -> Self {
        Self {
            id: banner.id,
            title: banner.title.clone(),
            subtitle: banner.subtitle.clone(),
            desktop_image_url: banner.desktop_image_url.clone(),
            mobile_image_url: banner.mobile_image_url.clone(),
            background_color: banner.background_color.clone(),
            cta_text: banner.cta_text.clone(),
            cta_link: banner.cta_link.clone(),
            open_in_new_tab: banner.open_in_new_tab,
            tile_size: banner.tile_size,
            priority: banner.priority,
            placements: banner.placements.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BannersResponse {
    pub banners: Vec<BannerView>,
}

/// `GET /storefront/banners`
///
/// Returns the active banners for the signed shop, filtered by the targeting
/// context carried in the query string. Responses are publicly cacheable;
/// the selection cache shares the same TTL so the two never disagree for
/// longer than one cache lifetime.
pub async fn fetch(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let identifier = client_identifier(&headers);
    let limits = state.config().rate_limits;
    let decision = state
        .limiter()
        .check(&identifier, limits.window, limits.fetch_max_requests)
        .await;
    if decision.limited {
        return Err(AppError::RateLimited);
    }

    let query = query.unwrap_or_default();
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let verification = state.verifier().verify_pairs(&pairs);
    let shop = match (verification.valid, verification.shop) {
        (true, Some(shop)) => shop,
        _ => return Err(AppError::Unauthorized("app proxy signature".to_owned())),
    };

    let context = targeting_context_from_pairs(&pairs);
    let now = Utc::now();

    let banners = state
        .selection_cache()
        .try_get_with((shop.clone(), context.clone()), async {
            select_active_banners(state.store(), &shop, &context, now)
                .await
                .map(Arc::new)
        })
        .await
        .map_err(|e| AppError::Internal(format!("banner selection failed: {e}")))?;

    let body = BannersResponse {
        banners: banners.iter().map(BannerView::from).collect(),
    };

    Ok((
        [(
            header::CACHE_CONTROL,
            format!(
                "public, max-age={}, stale-while-revalidate={}",
                CACHE_MAX_AGE.as_secs(),
                CACHE_STALE_WHILE_REVALIDATE.as_secs()
            ),
        )],
        Json(body),
    ))
}

/// Build the targeting context from already-decoded query pairs.
///
/// Empty and whitespace-only values are treated as absent, and `tags` is a
/// comma-separated list with blanks dropped.
fn targeting_context_from_pairs(pairs: &[(String, String)]) -> TargetingContext {
    let value = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };

    let tags = value("tags").map_or_else(Vec::new, |raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect()
    });

    TargetingContext {
        collection_id: value("collection_id"),
        tags,
        vendor: value("vendor"),
        product_type: value("product_type"),
    }
}
