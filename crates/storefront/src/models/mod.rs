//! Domain models for the storefront edge.
//!
//! These are read-only views of rows owned by the admin CRUD application;
//! the edge never mutates a banner or shop.

pub mod banner;
pub mod shop;

pub use banner::{Banner, DailyTotals};
pub use shop::Shop;
