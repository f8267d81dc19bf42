//! Database connection pool and migration management.
//!
//! This module provides utilities for:
//! - Creating and managing a SQLite connection pool inside the data directory
//! - Running database migrations automatically
//!
//! SQLite is the single source of truth for key uniqueness and inventory
//! atomicity; nothing in the engine caches key or stock state across requests.

use std::path::Path;
use std::time::Duration;

use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

/// Type alias for the SQLite connection pool.
///
/// Instead of writing `Pool<Sqlite>` everywhere, we can use `DbPool`.
pub type DbPool = Pool<Sqlite>;

/// Create the data directory (if needed) and open a SQLite connection pool
/// on `<data_dir>/altgen.db`.
///
/// # Configuration
///
/// - Maximum connections: 5
/// - WAL journal mode, so concurrent readers never block the single writer
/// - 5 second busy timeout, so concurrent withdrawals queue instead of
///   failing immediately with SQLITE_BUSY
///
/// # Errors
///
/// Returns an error if:
/// - The data directory cannot be created
/// - The database file cannot be opened or created
pub async fn create_pool(data_dir: &str) -> anyhow::Result<DbPool> {
    std::fs::create_dir_all(data_dir)?;

    let options = SqliteConnectOptions::new()
        .filename(Path::new(data_dir).join("altgen.db"))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        // Limit concurrent connections
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Run database migrations from the `migrations/` directory.
///
/// This function executes all SQL migration files in order. Migrations are
/// tracked in a special `_sqlx_migrations` table, so each migration runs only once.
///
/// # Errors
///
/// Returns an error if migration files contain invalid SQL or the database
/// fails during migration execution.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::{DbPool, create_pool, run_migrations};
    use tempfile::TempDir;

    /// Open a migrated pool on a throwaway data directory.
    ///
    /// The TempDir must be kept alive by the caller for the lifetime of the
    /// pool, otherwise the database file disappears under it.
    pub(crate) async fn test_pool() -> (TempDir, DbPool) {
        let dir = tempfile::tempdir().expect("create temp data dir");
        let pool = create_pool(dir.path().to_str().expect("utf-8 temp path"))
            .await
            .expect("open test pool");
        run_migrations(&pool).await.expect("run migrations");
        (dir, pool)
    }
}
