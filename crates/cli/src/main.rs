//! Café de Origen CLI - Backend seeding and checks.
//!
//! # Usage
//!
//! ```bash
//! # Check that the backend answers
//! origen-cli ping
//!
//! # Create every product listed in a JSON file
//! origen-cli seed products --file data/products.json
//! ```
//!
//! # Commands
//!
//! - `ping` - Call the backend greeting endpoint
//! - `seed products` - Load the product catalogue through the backend API

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "origen-cli")]
#[command(author, version, about = "Café de Origen CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable
    Ping,
    /// Seed backend data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Create products from a JSON array
    Products {
        /// Path to the products file
        #[arg(short, long, default_value = "data/products.json")]
        file: PathBuf,

        /// Validate the file without calling the backend
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Ping => commands::ping::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, dry_run } => {
                commands::seed::products(&file, dry_run).await?;
            }
        },
    }
    Ok(())
}
