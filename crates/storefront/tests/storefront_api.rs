//! End-to-end tests for the public App Proxy endpoints.
//!
//! The full router runs in-process against the in-memory banner store, so
//! every test exercises the real request path: rate limit, signature
//! verification, selection, and analytics writes. No database or network
//! is required.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

use plp_banners_core::{
    BannerId, BannerStatus, Placement, PlacementKind, ShopDomain, ShopId, TargetKind,
    TargetingRule, TileSize, TrackEvent,
};
use plp_banners_storefront::config::{RateLimitSettings, StorefrontConfig};
use plp_banners_storefront::db::{BannerStore, MemoryBannerStore, RepositoryError};
use plp_banners_storefront::models::{Banner, DailyTotals, Shop};
use plp_banners_storefront::routes;
use plp_banners_storefront::state::AppState;

const SECRET: &str = "hush_dont_tell_anyone_7f3b9c2e4a1d";
const SHOP: &str = "dev-store.myshopify.com";

// ============================================================================
// Helpers
// ============================================================================

fn test_config(limits: RateLimitSettings) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse::<IpAddr>().expect("valid host"),
        port: 0,
        api_secret: SecretString::from(SECRET),
        redis_url: None,
        rate_limits: limits,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

fn app(store: Arc<dyn BannerStore>, limits: RateLimitSettings) -> Router {
    let state = AppState::new(test_config(limits), store).expect("state");
    Router::new().merge(routes::routes()).with_state(state)
}

fn default_limits() -> RateLimitSettings {
    RateLimitSettings {
        window: Duration::from_millis(60_000),
        fetch_max_requests: 120,
        track_max_requests: 60,
    }
}

/// Compute the App Proxy signature over the given pairs and return a query
/// string with the signature appended.
fn signed_query(pairs: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let input: String = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();

    let mut mac =
        Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).expect("HMAC accepts any key length");
    mac.update(input.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let mut query: String = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}&"))
        .collect();
    query.push_str(&format!("signature={signature}"));
    query
}

fn seeded_store() -> Arc<MemoryBannerStore> {
    let store = Arc::new(MemoryBannerStore::new());
    store.add_shop(Shop {
        id: ShopId::new(1),
        domain: ShopDomain::parse(SHOP).expect("valid domain"),
        name: "Dev Store".to_owned(),
        created_at: Utc::now(),
    });
    store
}

fn banner(id: i32, shop_id: i32, priority: i32) -> Banner {
    Banner {
        id: BannerId::new(id),
        shop_id: ShopId::new(shop_id),
        status: BannerStatus::Active,
        priority,
        title: Some("Summer Sale".to_owned()),
        subtitle: None,
        desktop_image_url: None,
        mobile_image_url: None,
        background_color: Some("#FF6B35".to_owned()),
        cta_text: None,
        cta_link: None,
        open_in_new_tab: false,
        tile_size: TileSize::Size1x1,
        start_date: None,
        end_date: None,
        placements: vec![Placement {
            kind: PlacementKind::AfterIndex,
            position: 3,
        }],
        targeting_rules: Vec::new(),
    }
}

async fn get(app: &Router, query: &str, ip: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
    let request = Request::builder()
        .uri(format!("/storefront/banners?{query}"))
        .header("x-forwarded-for", ip)
        .header(header::ORIGIN, "https://dev-store.myshopify.com")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, headers, json)
}

async fn post_track(app: &Router, query: &str, body: &str, ip: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/storefront/track?{query}"))
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_owned()))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

/// Store wrapper that counts every data-layer call, to prove unauthenticated
/// requests never reach persistence.
struct CountingStore {
    inner: Arc<MemoryBannerStore>,
    calls: AtomicUsize,
}

impl CountingStore {
    fn new(inner: Arc<MemoryBannerStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BannerStore for CountingStore {
    async fn shop_by_domain(&self, domain: &ShopDomain) -> Result<Option<Shop>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.shop_by_domain(domain).await
    }

    async fn active_banners(
        &self,
        shop_id: ShopId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Banner>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.active_banners(shop_id, now).await
    }

    async fn banner_belongs_to_shop(
        &self,
        banner_id: BannerId,
        shop_id: ShopId,
    ) -> Result<bool, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.banner_belongs_to_shop(banner_id, shop_id).await
    }

    async fn record_event(
        &self,
        banner_id: BannerId,
        date: NaiveDate,
        event: TrackEvent,
    ) -> Result<(), RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.record_event(banner_id, date, event).await
    }

    async fn daily_totals(
        &self,
        banner_id: BannerId,
        date: NaiveDate,
    ) -> Result<DailyTotals, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.daily_totals(banner_id, date).await
    }
}

// ============================================================================
// Banner fetch
// ============================================================================

#[tokio::test]
async fn test_fetch_returns_banners_with_cache_headers() {
    let store = seeded_store();
    store.add_banner(banner(1, 1, 10));
    let app = app(store, default_limits());

    let query = signed_query(&[("shop", SHOP)]);
    let (status, headers, body) = get(&app, &query, "203.0.113.1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("public, max-age=60, stale-while-revalidate=120")
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let banners = body["banners"].as_array().expect("banners array");
    assert_eq!(banners.len(), 1);
    assert_eq!(banners[0]["id"], 1);
    assert_eq!(banners[0]["backgroundColor"], "#FF6B35");
    assert_eq!(banners[0]["tileSize"], "SIZE_1x1");
    assert_eq!(banners[0]["placements"][0]["type"], "AFTER_INDEX");
    assert_eq!(banners[0]["placements"][0]["position"], 3);
}

#[tokio::test]
async fn test_fetch_applies_targeting_context() {
    let store = seeded_store();
    let mut targeted = banner(1, 1, 10);
    targeted.targeting_rules = vec![TargetingRule {
        kind: TargetKind::Tag,
        value: "sale".to_owned(),
    }];
    store.add_banner(targeted);
    store.add_banner(banner(2, 1, 5));
    let app = app(store, default_limits());

    let query = signed_query(&[("shop", SHOP), ("tags", "Sale,new")]);
    let (status, _, body) = get(&app, &query, "203.0.113.2").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["banners"]
        .as_array()
        .expect("banners array")
        .iter()
        .map(|b| b["id"].as_i64().expect("id"))
        .collect();
    assert_eq!(ids, vec![1, 2], "tag match is case-insensitive");

    let query = signed_query(&[("shop", SHOP), ("tags", "other")]);
    let (_, _, body) = get(&app, &query, "203.0.113.3").await;
    let ids: Vec<i64> = body["banners"]
        .as_array()
        .expect("banners array")
        .iter()
        .map(|b| b["id"].as_i64().expect("id"))
        .collect();
    assert_eq!(ids, vec![2], "only the untargeted banner matches");
}

#[tokio::test]
async fn test_fetch_unknown_shop_returns_empty_list() {
    let app = app(seeded_store(), default_limits());

    let query = signed_query(&[("shop", "someone-else.myshopify.com")]);
    let (status, _, body) = get(&app, &query, "203.0.113.4").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["banners"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_fetch_invalid_signature_rejected_before_data_access() {
    let inner = seeded_store();
    inner.add_banner(banner(1, 1, 10));
    let counting = Arc::new(CountingStore::new(inner));
    let app = app(counting.clone(), default_limits());

    let query = format!("shop={SHOP}&signature={}", "0".repeat(64));
    let (status, _, body) = get(&app, &query, "203.0.113.5").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid signature");
    assert_eq!(counting.call_count(), 0, "no data-layer call may happen");
}

#[tokio::test]
async fn test_fetch_missing_signature_rejected() {
    let app = app(seeded_store(), default_limits());

    let (status, _, _) = get(&app, &format!("shop={SHOP}"), "203.0.113.6").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_fetch_rate_limit_enforced_per_client() {
    let limits = RateLimitSettings {
        window: Duration::from_millis(60_000),
        fetch_max_requests: 2,
        track_max_requests: 60,
    };
    let store = seeded_store();
    store.add_banner(banner(1, 1, 10));
    let app = app(store, limits);

    let query = signed_query(&[("shop", SHOP)]);
    for _ in 0..2 {
        let (status, _, _) = get(&app, &query, "203.0.113.7").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, body) = get(&app, &query, "203.0.113.7").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded");

    // A different client is unaffected.
    let (status, _, _) = get(&app, &query, "203.0.113.8").await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Tracking
// ============================================================================

#[tokio::test]
async fn test_track_records_impressions_and_clicks() {
    let store = seeded_store();
    store.add_banner(banner(1, 1, 10));
    let app = app(store.clone(), default_limits());

    let query = signed_query(&[("shop", SHOP)]);
    let (status, body) =
        post_track(&app, &query, r#"{"bannerId":1,"event":"impression"}"#, "203.0.113.9").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, _) =
        post_track(&app, &query, r#"{"bannerId":1,"event":"impression"}"#, "203.0.113.9").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) =
        post_track(&app, &query, r#"{"bannerId":1,"event":"click"}"#, "203.0.113.9").await;
    assert_eq!(status, StatusCode::OK);

    let totals = store
        .daily_totals(BannerId::new(1), Utc::now().date_naive())
        .await
        .expect("totals");
    assert_eq!(totals.impressions, 2);
    assert_eq!(totals.clicks, 1);
}

#[tokio::test]
async fn test_track_cross_shop_banner_is_not_found() {
    let store = seeded_store();
    store.add_shop(Shop {
        id: ShopId::new(2),
        domain: ShopDomain::parse("other-store.myshopify.com").expect("valid domain"),
        name: "Other Store".to_owned(),
        created_at: Utc::now(),
    });
    // Banner 5 belongs to shop 2, request is signed for shop 1.
    store.add_banner(banner(5, 2, 10));
    let app = app(store.clone(), default_limits());

    let query = signed_query(&[("shop", SHOP)]);
    let (status, body) =
        post_track(&app, &query, r#"{"bannerId":5,"event":"click"}"#, "203.0.113.10").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");

    let totals = store
        .daily_totals(BannerId::new(5), Utc::now().date_naive())
        .await
        .expect("totals");
    assert_eq!(totals.impressions + totals.clicks, 0, "no counter touched");
}

#[tokio::test]
async fn test_track_unknown_shop_is_not_found() {
    let app = app(seeded_store(), default_limits());

    let query = signed_query(&[("shop", "ghost-shop.myshopify.com")]);
    let (status, _) =
        post_track(&app, &query, r#"{"bannerId":1,"event":"click"}"#, "203.0.113.11").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_track_validates_body() {
    let store = seeded_store();
    store.add_banner(banner(1, 1, 10));
    let app = app(store, default_limits());
    let query = signed_query(&[("shop", SHOP)]);

    let (status, body) = post_track(&app, &query, "{not json", "203.0.113.12").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON");

    let (status, body) =
        post_track(&app, &query, r#"{"bannerId":0,"event":"click"}"#, "203.0.113.12").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid bannerId");

    let (status, body) =
        post_track(&app, &query, r#"{"event":"click"}"#, "203.0.113.12").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid bannerId");

    let (status, body) =
        post_track(&app, &query, r#"{"bannerId":1,"event":"view"}"#, "203.0.113.12").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid event type");
}

#[tokio::test]
async fn test_track_invalid_signature_rejected_before_data_access() {
    let inner = seeded_store();
    inner.add_banner(banner(1, 1, 10));
    let counting = Arc::new(CountingStore::new(inner));
    let app = app(counting.clone(), default_limits());

    let query = format!("shop={SHOP}&signature={}", "0".repeat(64));
    let (status, _) =
        post_track(&app, &query, r#"{"bannerId":1,"event":"click"}"#, "203.0.113.13").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(counting.call_count(), 0, "no data-layer call may happen");
}

#[tokio::test]
async fn test_track_uses_stricter_budget_than_fetch() {
    let limits = RateLimitSettings {
        window: Duration::from_millis(60_000),
        fetch_max_requests: 100,
        track_max_requests: 2,
    };
    let store = seeded_store();
    store.add_banner(banner(1, 1, 10));
    let app = app(store, limits);
    let query = signed_query(&[("shop", SHOP)]);

    for _ in 0..2 {
        let (status, _) =
            post_track(&app, &query, r#"{"bannerId":1,"event":"click"}"#, "203.0.113.14").await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) =
        post_track(&app, &query, r#"{"bannerId":1,"event":"click"}"#, "203.0.113.14").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // The fetch namespace for the same client still has budget.
    let (status, _, _) = get(&app, &query, "203.0.113.14").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_track_rejects_wrong_method() {
    let app = app(seeded_store(), default_limits());

    let query = signed_query(&[("shop", SHOP)]);
    let request = Request::builder()
        .uri(format!("/storefront/track?{query}"))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_track_preflight_allowed() {
    let app = app(seeded_store(), default_limits());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/storefront/track")
        .header(header::ORIGIN, "https://dev-store.myshopify.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
