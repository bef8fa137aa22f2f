//! Public impression/click tracking endpoint.

use axum::{
    Json,
    body::Bytes,
    extract::{RawQuery, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use plp_banners_core::{BannerId, TrackEvent};

use crate::error::{AppError, Result};
use crate::middleware::client_identifier;
use crate::state::AppState;

/// Tracking payload as sent by the storefront widget. Fields are optional so
/// each validation failure gets its own message instead of one opaque serde
/// error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackRequest {
    banner_id: Option<i64>,
    event: Option<String>,
}

/// `POST /storefront/track`
///
/// Records one impression or click against the banner's daily counters.
/// Tracking writes are cheaper to abuse than reads, so this endpoint runs
/// under its own stricter rate-limit namespace. A banner id that does not
/// belong to the signed shop is a 404 with no counter touched.
pub async fn record(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Json<Value>> {
    let identifier = format!("track:{}", client_identifier(&headers));
    let limits = state.config().rate_limits;
    let decision = state
        .limiter()
        .check(&identifier, limits.window, limits.track_max_requests)
        .await;
    if decision.limited {
        return Err(AppError::RateLimited);
    }

    let verification = state
        .verifier()
        .verify_query(query.as_deref().unwrap_or_default());
    let shop = match (verification.valid, verification.shop) {
        (true, Some(shop)) => shop,
        _ => return Err(AppError::Unauthorized("app proxy signature".to_owned())),
    };

    let request: TrackRequest = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Invalid JSON".to_owned()))?;

    let raw_id = match request.banner_id {
        Some(id) if id >= 1 => id,
        _ => return Err(AppError::BadRequest("Invalid bannerId".to_owned())),
    };

    let event = match request.event.as_deref() {
        Some("impression") => TrackEvent::Impression,
        Some("click") => TrackEvent::Click,
        _ => return Err(AppError::BadRequest("Invalid event type".to_owned())),
    };

    let store = state.store();
    let shop_record = store
        .shop_by_domain(&shop)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("shop {shop}")))?;

    // Ids beyond i32 cannot exist, so they fall out as not-found rather
    // than bad-request.
    let banner_id = i32::try_from(raw_id)
        .map(BannerId::new)
        .map_err(|_| AppError::NotFound(format!("banner {raw_id}")))?;

    if !store.banner_belongs_to_shop(banner_id, shop_record.id).await? {
        return Err(AppError::NotFound(format!("banner {banner_id}")));
    }

    store
        .record_event(banner_id, Utc::now().date_naive(), event)
        .await?;

    Ok(Json(json!({ "ok": true })))
}
