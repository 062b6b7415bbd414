mod error;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, feature = "database-sqlite"))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    conversations: Arc<dyn ConversationRepo>,
    archived_conversations: Arc<dyn ArchivedConversationRepo>,
    erasure_requests: Arc<dyn ErasureRequestRepo>,
    subjects: Arc<dyn SubjectRepo>,
    job_leases: Arc<dyn JobLeaseRepo>,
}

enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(not(feature = "database-sqlite"))]
    _None(std::convert::Infallible),
}

/// Handle to the conversation store and its repositories.
///
/// Repositories are cached at construction time to avoid allocation on each access.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        let repos = CachedRepos {
            conversations: Arc::new(sqlite::SqliteConversationRepo::new(pool.clone())),
            archived_conversations: Arc::new(sqlite::SqliteArchivedConversationRepo::new(
                pool.clone(),
            )),
            erasure_requests: Arc::new(sqlite::SqliteErasureRequestRepo::new(pool.clone())),
            subjects: Arc::new(sqlite::SqliteSubjectRepo::new(pool.clone())),
            job_leases: Arc::new(sqlite::SqliteJobLeaseRepo::new(pool.clone())),
        };
        DbPool {
            inner: PoolStorage::Sqlite(pool),
            repos,
        }
    }

    /// Create a database pool from configuration
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .foreign_keys(true)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                tracing::debug!(path = %cfg.path, "Opened SQLite conversation store");
                Ok(Self::from_sqlite(pool))
            }
        }
    }

    /// Run database migrations using sqlx's migration runner
    /// This automatically creates and manages a _sqlx_migrations table
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
            #[cfg(not(feature = "database-sqlite"))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Get the main conversation store
    pub fn conversations(&self) -> Arc<dyn ConversationRepo> {
        Arc::clone(&self.repos.conversations)
    }

    /// Get the archive store
    pub fn archived_conversations(&self) -> Arc<dyn ArchivedConversationRepo> {
        Arc::clone(&self.repos.archived_conversations)
    }

    pub fn erasure_requests(&self) -> Arc<dyn ErasureRequestRepo> {
        Arc::clone(&self.repos.erasure_requests)
    }

    pub fn subjects(&self) -> Arc<dyn SubjectRepo> {
        Arc::clone(&self.repos.subjects)
    }

    pub fn job_leases(&self) -> Arc<dyn JobLeaseRepo> {
        Arc::clone(&self.repos.job_leases)
    }

    /// Get the underlying SQLite pool.
    #[cfg(feature = "database-sqlite")]
    pub fn sqlite_pool(&self) -> &sqlx::SqlitePool {
        match &self.inner {
            PoolStorage::Sqlite(pool) => pool,
        }
    }

    /// Health check for database connectivity
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(not(feature = "database-sqlite"))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}
