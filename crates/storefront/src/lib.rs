//! PLP Banners storefront edge library.
//!
//! Serves the public App Proxy endpoints that storefront widgets call:
//! banner fetch and impression/click tracking. Exposed as a library so the
//! API surface can be exercised in tests without a running server.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod ratelimit;
pub mod routes;
pub mod selector;
pub mod signature;
pub mod state;
