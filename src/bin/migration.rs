use anyhow::Context;
use clap::{Parser, Subcommand};
use item_events_api::{config, db};
use migrations::{Migrator, MigratorTrait};
use tracing::info;

/// Applies or rolls back the database schema
#[derive(Debug, Parser)]
#[command(name = "migration", version, about)]
struct Cli {
    /// Database URL; defaults to the configured `database_url`
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations
    Up {
        /// Number of migrations to apply; all when omitted
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(short, long, default_value_t = 1)]
        steps: u32,
    },
    /// Show which migrations have been applied
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    match cli.command.unwrap_or(Command::Up { steps: None }) {
        Command::Up { steps } => {
            info!(?steps, "Applying migrations");
            Migrator::up(&pool, steps).await?;
        }
        Command::Down { steps } => {
            info!(steps, "Rolling back migrations");
            Migrator::down(&pool, Some(steps)).await?;
        }
        Command::Status => {
            Migrator::status(&pool).await?;
        }
        Command::Fresh => {
            info!("Recreating schema from scratch");
            Migrator::fresh(&pool).await?;
        }
    }

    info!("Migration command completed successfully");
    db::close_pool(pool).await?;
    Ok(())
}
