//! Scheduled banner lifecycle transitions.
//!
//! Run this every few minutes from a scheduler (cron, Fly machines schedule,
//! GitHub Actions):
//!
//! ```bash
//! plp-banners process-banners
//! ```
//!
//! Two transitions are applied, in order:
//!
//! 1. `SCHEDULED` banners whose start has passed (and whose end, if any, has
//!    not) become `ACTIVE`.
//! 2. `ACTIVE` banners whose end has passed become `EXPIRED`.
//!
//! The storefront never trusts status alone; it re-checks the date window on
//! every read. This job exists so the admin UI and analytics reflect the real
//! lifecycle, not to gate delivery.

use chrono::Utc;

use super::{CommandError, connect};

/// Apply all lifecycle transitions that are due.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an update fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;
    let now = Utc::now();

    let activated = sqlx::query(
        r"
        UPDATE banners
        SET status = 'ACTIVE'
        WHERE status = 'SCHEDULED'
          AND start_date <= $1
          AND (end_date IS NULL OR end_date > $1)
        ",
    )
    .bind(now)
    .execute(&pool)
    .await?
    .rows_affected();

    let expired = sqlx::query(
        r"
        UPDATE banners
        SET status = 'EXPIRED'
        WHERE status = 'ACTIVE'
          AND end_date <= $1
        ",
    )
    .bind(now)
    .execute(&pool)
    .await?
    .rows_affected();

    tracing::info!(activated, expired, "Processed scheduled banners");
    Ok(())
}
