//! Balance Botanica CLI - database maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! bb-cli migrate
//!
//! # Load or refresh the catalogue from YAML
//! bb-cli seed products catalogue.yaml
//!
//! # Delete expired sessions
//! bb-cli sessions purge
//!
//! # Inspect and move orders
//! bb-cli orders list --status pending
//! bb-cli orders set-status 806039 confirmed
//! ```
//!
//! Every command reads `BB_DATABASE_URL` (or `DATABASE_URL`), from `.env`
//! when present.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use balance_botanica_core::{OrderId, OrderStatus};

mod commands;

#[derive(Parser)]
#[command(name = "bb-cli")]
#[command(author, version, about = "Balance Botanica maintenance tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage sign-in sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Inspect and manage orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert or replace products from a YAML list
    Products {
        /// Path to the YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Delete expired sessions
    Purge,
}

#[derive(Subcommand)]
enum OrderAction {
    /// List orders, newest first
    List {
        /// Only orders with this status
        #[arg(short, long)]
        status: Option<OrderStatus>,
    },
    /// Move an order to a new status, following the normal lifecycle rules
    SetStatus {
        /// Order number
        id: String,
        /// Target status
        status: OrderStatus,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Seed {
            target: SeedTarget::Products { file },
        } => commands::seed::products(&pool, &file).await?,
        Commands::Sessions {
            action: SessionAction::Purge,
        } => commands::sessions::purge(&pool).await?,
        Commands::Orders { action } => match action {
            OrderAction::List { status } => commands::orders::list(&pool, status).await?,
            OrderAction::SetStatus { id, status } => {
                commands::orders::set_status(&pool, &OrderId::new(id), status).await?;
            }
        },
    }
    Ok(())
}
