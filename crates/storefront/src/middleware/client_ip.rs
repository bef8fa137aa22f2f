//! Client IP extraction for rate-limit keying.
//!
//! Checks Cloudflare's `CF-Connecting-IP` header first, then falls back to
//! standard proxy headers. The App Proxy sits behind Cloudflare and Fly.io,
//! so the socket peer address is never the real client.

use std::net::IpAddr;

use axum::http::HeaderMap;

/// Identifier used to key the rate limiter for this request.
///
/// Returns the first parseable client IP from the proxy headers, or the
/// literal `"unknown"` when none is present. Unknown clients share one
/// bucket on purpose: a flood that strips its forwarding headers should
/// throttle itself, not bypass the limiter.
#[must_use]
pub fn client_identifier(headers: &HeaderMap) -> String {
    client_ip(headers).map_or_else(|| "unknown".to_owned(), |ip| ip.to_string())
}

fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    // Try CF-Connecting-IP first (Cloudflare's real client IP)
    if let Some(ip) = headers
        .get("cf-connecting-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    // Try X-Forwarded-For (first IP in the chain)
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    // Try X-Real-IP
    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    // Try Fly-Client-IP (Fly.io's header)
    headers
        .get("fly-client-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}
