//! Status and size enums for banner entities.
//!
//! All enums here are closed: database rows and request payloads are parsed
//! into them at the boundary, so a new variant is a compile-time exhaustiveness
//! failure everywhere it matters, not a silent default branch.

use serde::{Deserialize, Serialize};

/// Banner lifecycle status.
///
/// Storefront eligibility is NOT derived from this field alone: a scheduler
/// collaborator promotes `Scheduled` -> `Active` and `Active` -> `Expired` on
/// a timer, so readers must always re-check the start/end date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BannerStatus {
    #[default]
    Draft,
    Active,
    Scheduled,
    Paused,
    Expired,
}

impl std::fmt::Display for BannerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BannerStatus {
    /// The database/API representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Scheduled => "SCHEDULED",
            Self::Paused => "PAUSED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::str::FromStr for BannerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "SCHEDULED" => Ok(Self::Scheduled),
            "PAUSED" => Ok(Self::Paused),
            "EXPIRED" => Ok(Self::Expired),
            _ => Err(format!("invalid banner status: {s}")),
        }
    }
}

/// Tile footprint of a banner inside the product grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TileSize {
    #[default]
    #[serde(rename = "SIZE_1x1")]
    Size1x1,
    #[serde(rename = "SIZE_2x1")]
    Size2x1,
    #[serde(rename = "SIZE_2x2")]
    Size2x2,
}

impl TileSize {
    /// The database/API representation of the tile size.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Size1x1 => "SIZE_1x1",
            Self::Size2x1 => "SIZE_2x1",
            Self::Size2x2 => "SIZE_2x2",
        }
    }
}

impl std::str::FromStr for TileSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIZE_1x1" => Ok(Self::Size1x1),
            "SIZE_2x1" => Ok(Self::Size2x1),
            "SIZE_2x2" => Ok(Self::Size2x2),
            _ => Err(format!("invalid tile size: {s}")),
        }
    }
}

/// Telemetry event kind accepted by the tracking endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackEvent {
    Impression,
    Click,
}

impl std::fmt::Display for TrackEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Impression => f.write_str("impression"),
            Self::Click => f.write_str("click"),
        }
    }
}
