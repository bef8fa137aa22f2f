//! Banner placements: where a banner tile is inserted into a product grid.

use serde::{Deserialize, Serialize};

/// Placement kind: position by absolute product index or by grid row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementKind {
    AfterIndex,
    AfterRow,
}

impl PlacementKind {
    /// The database/API representation of the placement kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AfterIndex => "AFTER_INDEX",
            Self::AfterRow => "AFTER_ROW",
        }
    }
}

impl std::str::FromStr for PlacementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AFTER_INDEX" => Ok(Self::AfterIndex),
            "AFTER_ROW" => Ok(Self::AfterRow),
            _ => Err(format!("invalid placement type: {s}")),
        }
    }
}

/// A single placement rule. A banner may carry several, each independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(rename = "type")]
    pub kind: PlacementKind,
    /// Non-negative product index or row number, depending on `kind`.
    pub position: u32,
}

impl Placement {
    /// Resolve this placement to an absolute insertion index in a grid of
    /// `product_count` products laid out in `columns` columns.
    ///
    /// The index is clamped to `product_count` (append at the end).
    #[must_use]
    pub fn insertion_index(&self, product_count: u32, columns: u32) -> u32 {
        let raw = match self.kind {
            PlacementKind::AfterIndex => self.position,
            PlacementKind::AfterRow => self.position.saturating_mul(columns),
        };
        raw.min(product_count)
    }
}

/// A placement resolved against a concrete grid, paired with the priority of
/// the banner that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPlacement {
    pub banner_index: usize,
    pub insertion_index: u32,
    pub priority: i32,
}

/// Resolve which placement wins each grid slot.
///
/// Placements are sorted by insertion index descending, then priority
/// descending, and the first placement observed for each index wins. When two
/// placements resolve to the identical index with the identical priority, the
/// winner is whichever came first in scan order. That tie-break is arbitrary
/// but long-standing; storefront themes depend on it being stable, so it is
/// preserved rather than improved.
#[must_use]
pub fn resolve_insertions(mut placements: Vec<ResolvedPlacement>) -> Vec<ResolvedPlacement> {
    placements.sort_by(|a, b| {
        b.insertion_index
            .cmp(&a.insertion_index)
            .then(b.priority.cmp(&a.priority))
    });

    let mut used = std::collections::HashSet::new();
    placements
        .into_iter()
        .filter(|p| used.insert(p.insertion_index))
        .collect()
}
