//! Database primitives: connection settings, the shared pool and the sea-orm backed
//! employee store.

mod employees;

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::info;

pub use employees::SeaOrmEmployeeStore;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (set {0})")]
    MissingUrl(&'static str),
    #[error("invalid value `{value}` for {key}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("failed to connect to database")]
    Connect(#[source] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

const URL_KEY: &str = "DATABASE_URL";
const MAX_CONNECTIONS_KEY: &str = "DATABASE_MAX_CONNECTIONS";
const CONNECT_TIMEOUT_KEY: &str = "DATABASE_CONNECT_TIMEOUT_SECS";
const SQL_LOGGING_KEY: &str = "DATABASE_SQL_LOGGING";

/// Environment-driven connection settings.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    url: Option<String>,
    max_connections: u32,
    connect_timeout_secs: u64,
    sql_logging: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    8
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            sql_logging: false,
        }
    }
}

impl DatabaseSettings {
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut settings = Self {
            url: get(URL_KEY),
            ..Self::default()
        };
        if let Some(raw) = get(MAX_CONNECTIONS_KEY) {
            settings.max_connections = parse_setting(MAX_CONNECTIONS_KEY, raw)?;
        }
        if let Some(raw) = get(CONNECT_TIMEOUT_KEY) {
            settings.connect_timeout_secs = parse_setting(CONNECT_TIMEOUT_KEY, raw)?;
        }
        if let Some(raw) = get(SQL_LOGGING_KEY) {
            settings.sql_logging = matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(settings)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// SQLite `:memory:` urls need a single connection to see one database.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn database_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn parse_setting<T: std::str::FromStr>(key: &'static str, raw: String) -> DbResult<T> {
    raw.parse()
        .map_err(|_| DbError::InvalidSetting { key, value: raw })
}

/// Opens the pool described by `settings`.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings
        .database_url()
        .ok_or(DbError::MissingUrl(URL_KEY))?;
    let mut options = ConnectOptions::new(url.to_owned());
    options
        .max_connections(settings.max_connections)
        .connect_timeout(settings.connect_timeout())
        .sqlx_logging(settings.sql_logging);
    let pool = Database::connect(options).await.map_err(DbError::Connect)?;
    info!(
        backend = ?pool.get_database_backend(),
        max_connections = settings.max_connections,
        "database pool ready"
    );
    Ok(pool)
}
