//! Core types for PLP Banners.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod placement;
pub mod status;
pub mod targeting;

pub use id::*;
pub use placement::{Placement, PlacementKind, ResolvedPlacement, resolve_insertions};
pub use status::{BannerStatus, TileSize, TrackEvent};
pub use targeting::{TargetKind, TargetingContext, TargetingRule};
