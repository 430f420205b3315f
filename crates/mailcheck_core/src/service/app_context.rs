//! Application scope owning the shared storage connection.
//!
//! # Responsibility
//! - Open the configured database once per process.
//! - Hand out a ready repository for the duration of one closure.
//!
//! # Invariants
//! - Only one repository borrows the connection at a time.
//! - Staged rows do not outlive the closure that staged them.

use crate::config::AppConfig;
use crate::db::DbResult;
use crate::repo::email_address_repo::{RepoResult, SqliteEmailAddressRepository};
use rusqlite::Connection;

/// Process-level context for seed and registration flows.
pub struct AppContext {
    config: AppConfig,
    conn: Connection,
}

impl AppContext {
    /// Opens and migrates the database described by `config`.
    pub fn open(config: AppConfig) -> DbResult<Self> {
        let conn = config.database.open()?;
        Ok(Self { config, conn })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Runs `f` with a repository bound to the shared connection.
    ///
    /// Uncommitted rows staged inside `f` are dropped when it returns.
    pub fn with_repository<T>(
        &mut self,
        f: impl FnOnce(&mut SqliteEmailAddressRepository<'_>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut repo = SqliteEmailAddressRepository::try_new(&mut self.conn)?;
        f(&mut repo)
    }
}
