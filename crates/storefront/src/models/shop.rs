//! Shop model.

use chrono::{DateTime, Utc};
use plp_banners_core::{ShopDomain, ShopId};

/// A merchant shop. Resolved once per request by domain, never mutated here.
#[derive(Debug, Clone)]
pub struct Shop {
    pub id: ShopId,
    pub domain: ShopDomain,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
