//! CLI command implementations.

pub mod migrate;
pub mod process_banners;
pub mod seed;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by the CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Refusing to run: {0}")]
    Refused(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to the banners database.
///
/// Reads `BANNERS_DATABASE_URL` with a fallback to the generic
/// `DATABASE_URL` (set by Fly.io postgres attach).
pub(crate) async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BANNERS_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("BANNERS_DATABASE_URL"))?;

    tracing::info!("Connecting to banners database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;
    Ok(pool)
}
