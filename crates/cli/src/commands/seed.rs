//! Seed the database with development fixtures.
//!
//! ```bash
//! plp-banners seed
//! ```
//!
//! Creates a demo shop and two sample banners so the storefront endpoints
//! have something to serve locally. Refuses to run when `APP_ENV=production`
//! because it would mix fixtures into real merchant data.

use super::{CommandError, connect};

/// Insert the development fixtures.
///
/// # Errors
///
/// Returns an error if `APP_ENV=production`, the database is unreachable,
/// or an insert fails.
pub async fn run() -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    if std::env::var("APP_ENV").as_deref() == Ok("production") {
        return Err(CommandError::Refused(
            "seed must not run in production; it would overwrite real data with fixtures"
                .to_owned(),
        ));
    }

    let pool = connect().await?;

    tracing::info!("Seeding database...");

    let (shop_id,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO shops (domain, name)
        VALUES ('dev-store.myshopify.com', 'Dev Store')
        ON CONFLICT (domain) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        ",
    )
    .fetch_one(&pool)
    .await?;

    let (summer_sale,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO banners
            (shop_id, status, priority, title, subtitle, background_color,
             cta_text, cta_link, open_in_new_tab, tile_size)
        VALUES
            ($1, 'ACTIVE', 10, 'Summer Sale', 'Up to 50% off selected items',
             '#FF6B35', 'Shop Now', '/collections/summer-sale', FALSE, 'SIZE_1x1')
        RETURNING id
        ",
    )
    .bind(shop_id)
    .fetch_one(&pool)
    .await?;

    sqlx::query(
        r"
        INSERT INTO banner_placements (banner_id, placement_type, position)
        VALUES ($1, 'AFTER_INDEX', 3), ($1, 'AFTER_INDEX', 9)
        ",
    )
    .bind(summer_sale)
    .execute(&pool)
    .await?;

    let (new_arrivals,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO banners
            (shop_id, status, priority, title, subtitle, background_color,
             cta_text, cta_link, open_in_new_tab, tile_size)
        VALUES
            ($1, 'ACTIVE', 5, 'New Arrivals', 'Check out our latest collection',
             '#1A1A2E', 'Explore', '/collections/new-arrivals', FALSE, 'SIZE_2x1')
        RETURNING id
        ",
    )
    .bind(shop_id)
    .fetch_one(&pool)
    .await?;

    sqlx::query(
        r"
        INSERT INTO banner_placements (banner_id, placement_type, position)
        VALUES ($1, 'AFTER_ROW', 2)
        ",
    )
    .bind(new_arrivals)
    .execute(&pool)
    .await?;

    sqlx::query(
        r"
        INSERT INTO banner_targeting_rules (banner_id, target_type, value)
        VALUES ($1, 'COLLECTION', 'all')
        ",
    )
    .bind(new_arrivals)
    .execute(&pool)
    .await?;

    tracing::info!(summer_sale, new_arrivals, "Seeded development fixtures");
    Ok(())
}
