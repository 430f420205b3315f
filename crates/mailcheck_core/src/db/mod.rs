//! SQLite storage bootstrap and schema entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections.
//! - Create the schema idempotently through versioned migrations.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Application data is not touched before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage bootstrap failures.
#[derive(Debug)]
pub enum DbError {
    /// SQLite failed outside of a migration batch, e.g. while opening.
    Sqlite(rusqlite::Error),
    /// A registered migration failed; the whole batch was rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The file was written by a newer binary.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Migration version that failed, if any.
    pub fn failed_migration(&self) -> Option<u32> {
        match self {
            Self::Migration { version, .. } => Some(*version),
            Self::Sqlite(_) | Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Migration { version, source } => {
                write!(f, "schema migration {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
