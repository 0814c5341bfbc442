//! AERO-X CLI - Database migrations and catalog tooling.
//!
//! # Usage
//!
//! ```bash
//! # Create the users and orders tables
//! aerox-cli migrate schema
//!
//! # Create the session table
//! aerox-cli migrate sessions
//!
//! # Both
//! aerox-cli migrate all
//!
//! # Validate the embedded catalog and print it
//! aerox-cli catalog
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "aerox-cli")]
#[command(author, version, about = "AERO-X store CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Validate the embedded product catalog
    Catalog,
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Users and orders tables
    Schema,
    /// Session store table
    Sessions,
    /// Run all database migrations
    All,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => {
            let pool = commands::migrate::connect().await?;
            match target {
                MigrateTarget::Schema => commands::migrate::schema(&pool).await?,
                MigrateTarget::Sessions => commands::migrate::sessions(&pool).await?,
                MigrateTarget::All => {
                    commands::migrate::schema(&pool).await?;
                    commands::migrate::sessions(&pool).await?;
                }
            }
        }
        Commands::Catalog => commands::catalog::check()?,
    }
    Ok(())
}
