//! # Connection Pool
//!
//! Opens the SQLite file, migrates it and hands out repositories that share
//! one pool.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   DbConfig ──► connect_options() ──► SqlitePool ──► run_migrations      │
//! │                  WAL journal              │                             │
//! │                  foreign_keys = ON        ├──► ProductRepository        │
//! │                  busy_timeout             ├──► SaleRepository           │
//! │                                           └──► CustomerRepository       │
//! │                                                                         │
//! │   Readers use any free connection. A unit of work holds SQLite's        │
//! │   write lock from its first write to commit; other writers wait up      │
//! │   to `busy_timeout` for it.                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::customer::CustomerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;

/// Environment variable holding the database file path.
pub const ENV_DB_PATH: &str = "STOCKROOM_DB_PATH";

/// Environment variable holding the pool size.
pub const ENV_DB_MAX_CONNECTIONS: &str = "STOCKROOM_DB_MAX_CONNECTIONS";

/// Database file used when no path is configured.
pub const DEFAULT_DB_PATH: &str = "./stockroom.db";

const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how the pool behaves.
///
/// ```rust
/// use std::time::Duration;
/// use stockroom_db::DbConfig;
///
/// let config = DbConfig::new("./data/stockroom.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(2));
/// assert_eq!(config.max_connections, 8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; created when missing. `:memory:` for a private database.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long to wait for a free pool connection.
    pub connect_timeout: Duration,
    /// How long a writer waits on another unit's write lock.
    pub busy_timeout: Duration,
    /// Idle connections are closed after this long. `None` keeps them.
    pub idle_timeout: Option<Duration>,
    /// Connections are recycled after this long. `None` keeps them.
    pub max_lifetime: Option<Duration>,
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed configuration: 5 connections, 5s busy timeout, migrations on.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(30 * 60)),
            run_migrations: true,
        }
    }

    /// Private in-memory database for tests.
    ///
    /// Every SQLite connection to `:memory:` opens its own empty database, so
    /// the pool is pinned to one connection that is never closed for idling
    /// or recycled for age.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            max_lifetime: None,
            ..DbConfig::new(IN_MEMORY_PATH)
        }
    }

    /// Reads `STOCKROOM_DB_PATH` and `STOCKROOM_DB_MAX_CONNECTIONS`.
    ///
    /// A pool size that is not a positive integer is ignored with a warning.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_DB_PATH).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        let mut config = DbConfig::new(path);

        if let Ok(raw) = std::env::var(ENV_DB_MAX_CONNECTIONS) {
            match raw.parse::<u32>() {
                Ok(max) if max > 0 => config.max_connections = max,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_DB_MAX_CONNECTIONS),
            }
        }

        config
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    /// Per-connection SQLite settings.
    ///
    /// Foreign keys are off by default in SQLite; `sale_items` relies on them
    /// for its cascade.
    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = format!("sqlite://{}?mode=rwc", self.database_path.display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .synchronous(SqliteSynchronous::Normal);

        // WAL needs a file; an in-memory database keeps its default journal.
        Ok(if self.is_in_memory() {
            options
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        })
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to an open, migrated database. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening database"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending migrations. Safe to call again.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    /// Closes the pool. Repositories obtained earlier fail afterwards.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// True when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
