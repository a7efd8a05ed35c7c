mod config;
mod http;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DbPool, SeaOrmEmployeeStore, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::{EmployeeRequest, EmployeeService, EmployeeStore, InMemoryEmployeeStore};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

/// Small roster inserted by `seed` into an empty table.
const DEMO_ROSTER: &[(&str, f64, &str)] = &[
    ("John Doe", 45000.0, "IT"),
    ("Jane Doe", 50000.0, "HR"),
    ("Ada Lovelace", 72000.0, "Engineering"),
    ("Grace Hopper", 68000.0, "Engineering"),
    ("Max Mustermann", 38000.0, "Operations"),
];

#[derive(Parser, Debug)]
#[command(name = "employee-server", version, about = "Employee records service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert a demo roster into an empty employee table.
    Seed,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
    #[arg(long, help = "Keep records in process memory instead of the database")]
    in_memory: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env())?;
    let cli = Cli::parse();
    let app_config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up(&app_config).await,
            MigrateCommand::Down => migrate_down(&app_config).await,
        },
        Command::Seed => run_seed(&app_config).await,
    }
}

async fn setup_pool(config: &AppConfig) -> Result<DbPool> {
    connect(&config.database).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let store: Arc<dyn EmployeeStore> =
        if cmd.in_memory || config.database.database_url().is_none() {
            if !cmd.in_memory {
                warn!("DATABASE_URL not set; records live in memory only");
            }
            Arc::new(InMemoryEmployeeStore::new())
        } else {
            let pool = setup_pool(&config).await?;
            ensure_migrations(&pool, cmd.allow_dirty).await?;
            Arc::new(SeaOrmEmployeeStore::new(pool))
        };
    let state = AppState {
        employees: EmployeeService::new(store),
        config,
    };
    http::serve(ServeConfig::from(&cmd), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `employee-server migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

async fn run_seed(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    ensure_migrations(&pool, false).await?;
    let service = EmployeeService::new(Arc::new(SeaOrmEmployeeStore::new(pool)));
    let inserted = seed_roster(&service).await?;
    if inserted == 0 {
        info!("employee table already populated; seed skipped");
    } else {
        info!(inserted, "demo employees seeded");
    }
    Ok(())
}

/// Adds [`DEMO_ROSTER`] through the service when no employees exist yet.
async fn seed_roster(service: &EmployeeService) -> Result<usize> {
    if !service.get_all().await?.is_empty() {
        return Ok(0);
    }
    for (name, salary, department) in DEMO_ROSTER {
        service
            .add(EmployeeRequest::new(*name, *salary, *department))
            .await
            .with_context(|| format!("failed to seed {name}"))?;
    }
    Ok(DEMO_ROSTER.len())
}
