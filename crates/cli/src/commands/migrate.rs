//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! plp-banners migrate
//! ```
//!
//! Migrations are embedded at compile time from
//! `crates/storefront/migrations/`, so the binary carries its own schema
//! history and can run anywhere the database is reachable.

use super::{CommandError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
