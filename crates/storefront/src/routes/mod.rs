//! HTTP route handlers for the public App Proxy surface.
//!
//! # Route Structure
//!
//! ```text
//! GET  /storefront/banners - Active banners for a shop + targeting context
//! POST /storefront/track   - Impression/click telemetry
//! ```
//!
//! Both endpoints are reached through the Shopify App Proxy and are
//! unauthenticated by session: the only authentication is the HMAC signature
//! Shopify attaches to the query string. Per-request ordering is fixed at
//! rate limit, then signature, then data access, so cheap attacks are
//! rejected before expensive work happens.

pub mod banners;
pub mod track;

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Create the public storefront routes.
///
/// The App Proxy serves these cross-origin from the shop's domain, so CORS
/// is wide open; the signature check is what gates access.
pub fn routes() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/storefront/banners", get(banners::fetch))
        .route("/storefront/track", post(track::record))
        .layer(cors)
}
