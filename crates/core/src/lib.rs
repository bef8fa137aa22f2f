//! PLP Banners Core - Shared types library.
//!
//! This crate provides common types used across all PLP Banners components:
//! - `storefront` - Public App Proxy edge serving banner configurations
//! - `cli` - Command-line tools for migrations, seeding, and scheduling
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, banner lifecycle status, placement and targeting kinds

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
