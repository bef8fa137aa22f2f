//! Banner selection for storefront delivery.
//!
//! Selection is a pure function over the eligible banners the store returns:
//! no side effects, safe to call concurrently, and cheap enough to cache by
//! `(shop, context)` for the response's public cache lifetime.

use chrono::{DateTime, Utc};

use plp_banners_core::{ShopDomain, TargetingContext};

use crate::db::{BannerStore, RepositoryError};
use crate::models::Banner;

/// Select the ordered set of banners to show for `domain` in `context`.
///
/// An unknown shop yields an empty list, never an error: the storefront
/// simply has nothing to show. Banners come back ordered by priority
/// descending with insertion order as the tie-break.
///
/// # Errors
///
/// Returns `RepositoryError` only for genuine data-layer failures.
pub async fn select_active_banners(
    store: &dyn BannerStore,
    domain: &ShopDomain,
    context: &TargetingContext,
    now: DateTime<Utc>,
) -> Result<Vec<Banner>, RepositoryError> {
    let Some(shop) = store.shop_by_domain(domain).await? else {
        return Ok(Vec::new());
    };

    let banners = store.active_banners(shop.id, now).await?;
    Ok(filter_by_targeting(banners, context, now))
}

/// Apply the eligibility and targeting predicates, preserving order.
///
/// The store already filters by status and date window; the date window is
/// re-checked here so a stale store implementation can never leak an expired
/// banner. A banner with zero targeting rules matches everywhere; otherwise
/// any single matching rule admits it.
#[must_use]
pub fn filter_by_targeting(
    banners: Vec<Banner>,
    context: &TargetingContext,
    now: DateTime<Utc>,
) -> Vec<Banner> {
    banners
        .into_iter()
        .filter(|banner| banner.is_live_at(now))
        .filter(|banner| {
            banner.targeting_rules.is_empty()
                || banner.targeting_rules.iter().any(|rule| rule.matches(context))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use plp_banners_core::{
        BannerId, BannerStatus, ShopId, TargetKind, TargetingRule, TileSize,
    };

    use crate::db::MemoryBannerStore;
    use crate::models::Shop;

    fn banner(id: i32, priority: i32, status: BannerStatus) -> Banner {
        Banner {
            id: BannerId::new(id),
            shop_id: ShopId::new(1),
            status,
            priority,
            title: Some(format!("banner-{id}")),
            subtitle: None,
            desktop_image_url: None,
            mobile_image_url: None,
            background_color: None,
            cta_text: None,
            cta_link: None,
            open_in_new_tab: false,
            tile_size: TileSize::Size1x1,
            start_date: None,
            end_date: None,
            placements: Vec::new(),
            targeting_rules: Vec::new(),
        }
    }

    fn tag_rule(value: &str) -> TargetingRule {
        TargetingRule {
            kind: TargetKind::Tag,
            value: value.to_owned(),
        }
    }

    fn store_with_shop() -> MemoryBannerStore {
        let store = MemoryBannerStore::new();
        store.add_shop(Shop {
            id: ShopId::new(1),
            domain: ShopDomain::parse("dev-store.myshopify.com").expect("valid domain"),
            name: "Dev Store".to_owned(),
            created_at: Utc::now(),
        });
        store
    }

    fn domain() -> ShopDomain {
        ShopDomain::parse("dev-store.myshopify.com").expect("valid domain")
    }

    #[tokio::test]
    async fn test_unknown_shop_returns_empty() {
        let store = MemoryBannerStore::new();
        let banners = select_active_banners(
            &store,
            &domain(),
            &TargetingContext::default(),
            Utc::now(),
        )
        .await
        .expect("selection");
        assert!(banners.is_empty());
    }

    #[tokio::test]
    async fn test_draft_and_out_of_window_banners_excluded() {
        let now = Utc::now();
        let store = store_with_shop();

        store.add_banner(banner(1, 1, BannerStatus::Draft));

        let mut future_start = banner(2, 1, BannerStatus::Active);
        future_start.start_date = Some(now + Duration::hours(1));
        store.add_banner(future_start);

        let mut past_end = banner(3, 1, BannerStatus::Active);
        past_end.end_date = Some(now - Duration::hours(1));
        store.add_banner(past_end);

        store.add_banner(banner(4, 1, BannerStatus::Active));

        let banners =
            select_active_banners(&store, &domain(), &TargetingContext::default(), now)
                .await
                .expect("selection");
        let ids: Vec<i32> = banners.iter().map(|b| b.id.as_i32()).collect();
        assert_eq!(ids, vec![4]);
    }

    #[tokio::test]
    async fn test_untargeted_banner_matches_any_context() {
        let store = store_with_shop();
        store.add_banner(banner(1, 1, BannerStatus::Active));

        let context = TargetingContext {
            collection_id: Some("999".to_owned()),
            tags: vec!["whatever".to_owned()],
            vendor: Some("nobody".to_owned()),
            product_type: Some("none".to_owned()),
        };

        let banners = select_active_banners(&store, &domain(), &context, Utc::now())
            .await
            .expect("selection");
        assert_eq!(banners.len(), 1);
    }

    #[tokio::test]
    async fn test_targeted_and_untargeted_ordering_scenario() {
        // Banner A: priority 10, rule TAG="sale". Banner B: priority 5, no rules.
        let store = store_with_shop();

        let mut a = banner(1, 10, BannerStatus::Active);
        a.targeting_rules = vec![tag_rule("sale")];
        store.add_banner(a);
        store.add_banner(banner(2, 5, BannerStatus::Active));

        let sale_context = TargetingContext {
            tags: vec!["Sale".to_owned()],
            ..TargetingContext::default()
        };
        let banners = select_active_banners(&store, &domain(), &sale_context, Utc::now())
            .await
            .expect("selection");
        let ids: Vec<i32> = banners.iter().map(|b| b.id.as_i32()).collect();
        assert_eq!(ids, vec![1, 2], "tag match is case-insensitive, A first");

        let other_context = TargetingContext {
            tags: vec!["other".to_owned()],
            ..TargetingContext::default()
        };
        let banners = select_active_banners(&store, &domain(), &other_context, Utc::now())
            .await
            .expect("selection");
        let ids: Vec<i32> = banners.iter().map(|b| b.id.as_i32()).collect();
        assert_eq!(ids, vec![2], "only the untargeted banner matches");
    }

    #[tokio::test]
    async fn test_any_rule_admits_banner() {
        let store = store_with_shop();
        let mut b = banner(1, 1, BannerStatus::Active);
        b.targeting_rules = vec![tag_rule("clearance"), tag_rule("sale")];
        store.add_banner(b);

        let context = TargetingContext {
            tags: vec!["sale".to_owned()],
            ..TargetingContext::default()
        };
        let banners = select_active_banners(&store, &domain(), &context, Utc::now())
            .await
            .expect("selection");
        assert_eq!(banners.len(), 1);
    }
}
