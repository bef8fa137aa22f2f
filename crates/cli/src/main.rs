//! PLP Banners CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! plp-banners migrate
//!
//! # Promote scheduled banners and expire ended ones
//! plp-banners process-banners
//!
//! # Seed development fixtures (refuses to run in production)
//! plp-banners seed
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `process-banners` - Apply lifecycle transitions due by the schedule
//! - `seed` - Seed database with development fixtures

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "plp-banners")]
#[command(author, version, about = "PLP Banners CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Activate scheduled banners whose window has opened and expire
    /// active banners whose window has closed
    ProcessBanners,
    /// Seed the database with development fixtures
    Seed,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::ProcessBanners => commands::process_banners::run().await?,
        Commands::Seed => commands::seed::run().await?,
    }
    Ok(())
}
