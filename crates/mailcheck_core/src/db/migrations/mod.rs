//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Running the executor on an up-to-date database changes nothing.

use crate::db::schema::create_all_sql;
use crate::db::{DbError, DbResult};
use log::{info, warn};
use rusqlite::{Connection, Transaction};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: fn() -> String,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: create_all_sql,
}];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the database is newer than this binary.
/// - `DbError::Migration` naming the first failing version; the whole batch
///   is rolled back.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        if let Err(source) = run_migration(&tx, migration) {
            warn!(
                "event=db_migrate module=db status=error from_version={} failed_version={} error={}",
                current_version, migration.version, source
            );
            return Err(DbError::Migration {
                version: migration.version,
                source,
            });
        }
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

fn run_migration(tx: &Transaction<'_>, migration: &Migration) -> rusqlite::Result<()> {
    tx.execute_batch(&(migration.sql)())?;
    tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
}

/// Reads `PRAGMA user_version` from `conn`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
