//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! The `Database` from `agri-db` holds a `SqlitePool`, so commands share it
//! without explicit locking.

use tracing::info;

use agri_db::{Database, DbConfig};

use crate::error::ApiResult;
use crate::state::config::DatabaseSettings;

/// Wrapper around `Database` handed to commands.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Connects to the configured database and applies migrations.
    pub async fn open(settings: &DatabaseSettings) -> ApiResult<Self> {
        let config =
            DbConfig::new(settings.path.clone()).max_connections(settings.max_connections);
        let db = Database::new(config).await?;
        info!(path = ?settings.path, "Database connected and migrations applied");
        Ok(DbState::new(db))
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }

    /// Closes the pool, flushing the WAL.
    pub async fn close(&self) {
        self.db.close().await;
    }

    /// In-memory registry for tests.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        DbState::new(db)
    }
}
