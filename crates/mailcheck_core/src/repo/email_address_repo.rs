//! Email address repository contract and SQLite unit-of-work.
//!
//! # Responsibility
//! - Stage validated `EmailAddress` values and flush them on `commit`.
//! - Insert new records and update persisted ones in place.
//! - Translate storage constraint failures into `IntegrityViolation`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - One `commit` is one transaction: all staged rows land or none do.
//! - After a failed commit the repository refuses writes until `rollback`.
//! - `delete_all` runs immediately and is never staged.
//! - Read paths re-validate rows instead of masking bad persisted data.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::schema::{EMAIL_ADDRESS_TABLE, EMAIL_ADDRESS_TABLE_NAME};
use crate::db::DbError;
use crate::model::email_address::{EmailAddress, EmailAddressId, ValidationError};
use log::{info, warn};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const EMAIL_ADDRESS_SELECT_SQL: &str = "SELECT
    id,
    email,
    backup_email
FROM emailaddress";

const EMAIL_ADDRESS_INSERT_SQL: &str = "INSERT INTO emailaddress (
    id,
    email,
    backup_email
) VALUES (?1, ?2, ?3);";

const EMAIL_ADDRESS_UPDATE_SQL: &str = "UPDATE emailaddress
SET email = ?2, backup_email = ?3
WHERE id = ?1;";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from email address persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// A value failed field validation before reaching storage.
    Validation(ValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Storage rejected a commit because a constraint was violated.
    IntegrityViolation(String),
    /// A previous commit failed and `rollback` has not been called yet.
    PendingRollback,
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    /// A staged update targets a row that no longer exists.
    NotFound(EmailAddressId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::IntegrityViolation(message) => write!(f, "integrity violation: {message}"),
            Self::PendingRollback => write!(
                f,
                "previous commit failed; call rollback before issuing new writes"
            ),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted email address data: {message}")
            }
            Self::NotFound(id) => write!(f, "email address row {id} not found"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "email address repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "email address repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "email address repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::IntegrityViolation(_)
            | Self::PendingRollback
            | Self::InvalidData(_)
            | Self::NotFound(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Unit-of-work style repository for `EmailAddress` rows.
pub trait EmailAddressRepository {
    /// Stages one record for the next commit.
    fn add(&mut self, address: EmailAddress) -> RepoResult<()>;
    /// Stages many records for the next commit, keeping their order.
    fn add_all(&mut self, addresses: Vec<EmailAddress>) -> RepoResult<()>;
    /// Flushes staged records in one transaction and returns them with ids.
    fn commit(&mut self) -> RepoResult<Vec<EmailAddress>>;
    /// Discards staged records and clears failed-commit state.
    ///
    /// Returns the number of discarded records.
    fn rollback(&mut self) -> usize;
    /// Deletes every row immediately. Returns the number of deleted rows.
    fn delete_all(&mut self) -> RepoResult<usize>;
    /// Loads one row by id.
    fn get(&self, id: EmailAddressId) -> RepoResult<Option<EmailAddress>>;
    /// Lists all rows ordered by id.
    fn list(&self) -> RepoResult<Vec<EmailAddress>>;
    /// Counts persisted rows.
    fn count(&self) -> RepoResult<u64>;
    /// Number of staged, uncommitted records.
    fn pending_count(&self) -> usize;
}

impl<T: EmailAddressRepository + ?Sized> EmailAddressRepository for &mut T {
    fn add(&mut self, address: EmailAddress) -> RepoResult<()> {
        (**self).add(address)
    }

    fn add_all(&mut self, addresses: Vec<EmailAddress>) -> RepoResult<()> {
        (**self).add_all(addresses)
    }

    fn commit(&mut self) -> RepoResult<Vec<EmailAddress>> {
        (**self).commit()
    }

    fn rollback(&mut self) -> usize {
        (**self).rollback()
    }

    fn delete_all(&mut self) -> RepoResult<usize> {
        (**self).delete_all()
    }

    fn get(&self, id: EmailAddressId) -> RepoResult<Option<EmailAddress>> {
        (**self).get(id)
    }

    fn list(&self) -> RepoResult<Vec<EmailAddress>> {
        (**self).list()
    }

    fn count(&self) -> RepoResult<u64> {
        (**self).count()
    }

    fn pending_count(&self) -> usize {
        (**self).pending_count()
    }
}

/// SQLite-backed email address repository.
pub struct SqliteEmailAddressRepository<'conn> {
    conn: &'conn mut Connection,
    pending: Vec<EmailAddress>,
    needs_rollback: bool,
}

impl<'conn> SqliteEmailAddressRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            pending: Vec::new(),
            needs_rollback: false,
        })
    }

    fn ensure_writable(&self) -> RepoResult<()> {
        if self.needs_rollback {
            return Err(RepoError::PendingRollback);
        }
        Ok(())
    }
}

impl EmailAddressRepository for SqliteEmailAddressRepository<'_> {
    fn add(&mut self, address: EmailAddress) -> RepoResult<()> {
        self.ensure_writable()?;
        self.pending.push(address);
        Ok(())
    }

    fn add_all(&mut self, addresses: Vec<EmailAddress>) -> RepoResult<()> {
        self.ensure_writable()?;
        self.pending.extend(addresses);
        Ok(())
    }

    fn commit(&mut self) -> RepoResult<Vec<EmailAddress>> {
        self.ensure_writable()?;
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        let started_at = Instant::now();
        match flush_rows(self.conn, &self.pending) {
            Ok(ids) => {
                let mut committed = std::mem::take(&mut self.pending);
                for (address, id) in committed.iter_mut().zip(ids) {
                    address.mark_persisted(id);
                }
                info!(
                    "event=repo_commit module=repo status=ok rows={} duration_ms={}",
                    committed.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(committed)
            }
            Err(err) => {
                self.needs_rollback = true;
                warn!(
                    "event=repo_commit module=repo status=error rows={} duration_ms={} error_code={} error={}",
                    self.pending.len(),
                    started_at.elapsed().as_millis(),
                    error_code(&err),
                    err
                );
                Err(err)
            }
        }
    }

    fn rollback(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        self.needs_rollback = false;
        info!("event=repo_rollback module=repo status=ok discarded={discarded}");
        discarded
    }

    fn delete_all(&mut self) -> RepoResult<usize> {
        self.ensure_writable()?;
        let deleted = self.conn.execute("DELETE FROM emailaddress;", [])?;
        info!("event=repo_delete_all module=repo status=ok rows={deleted}");
        Ok(deleted)
    }

    fn get(&self, id: EmailAddressId) -> RepoResult<Option<EmailAddress>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EMAIL_ADDRESS_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_email_address_row(row)?));
        }

        Ok(None)
    }

    fn list(&self) -> RepoResult<Vec<EmailAddress>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EMAIL_ADDRESS_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut addresses = Vec::new();

        while let Some(row) = rows.next()? {
            addresses.push(parse_email_address_row(row)?);
        }

        Ok(addresses)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM emailaddress;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Writes staged rows in one transaction and returns their ids in order.
///
/// Persisted records are updated by id; everything else is inserted.
fn flush_rows(conn: &mut Connection, rows: &[EmailAddress]) -> RepoResult<Vec<EmailAddressId>> {
    let tx = conn.transaction()?;
    let mut ids = Vec::with_capacity(rows.len());
    {
        let mut insert = tx.prepare(EMAIL_ADDRESS_INSERT_SQL)?;
        let mut update = tx.prepare(EMAIL_ADDRESS_UPDATE_SQL)?;
        for address in rows {
            match address.id() {
                Some(id) if address.is_persisted() => {
                    let changed = update
                        .execute(params![id, address.email(), address.backup_email()])
                        .map_err(classify_write_error)?;
                    if changed == 0 {
                        return Err(RepoError::NotFound(id));
                    }
                    ids.push(id);
                }
                _ => {
                    insert
                        .execute(params![
                            address.id(),
                            address.email(),
                            address.backup_email()
                        ])
                        .map_err(classify_write_error)?;
                    ids.push(tx.last_insert_rowid());
                }
            }
        }
    }
    // Dropping `tx` on any early return above rolls the batch back.
    tx.commit().map_err(classify_write_error)?;
    Ok(ids)
}

fn classify_write_error(err: rusqlite::Error) -> RepoError {
    match err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            RepoError::IntegrityViolation(message.unwrap_or_else(|| failure.to_string()))
        }
        other => RepoError::from(other),
    }
}

fn error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::IntegrityViolation(_) => "integrity_violation",
        RepoError::NotFound(_) => "row_not_found",
        _ => "db_write_failed",
    }
}

fn parse_email_address_row(row: &Row<'_>) -> RepoResult<EmailAddress> {
    let id: EmailAddressId = row.get("id")?;
    let email: String = row.get("email")?;
    let backup_email: String = row.get("backup_email")?;

    EmailAddress::from_storage(id, email, backup_email).map_err(|err| {
        RepoError::InvalidData(format!(
            "row {id} has invalid value in {EMAIL_ADDRESS_TABLE_NAME}.{}",
            err.field()
        ))
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, EMAIL_ADDRESS_TABLE.name)? {
        return Err(RepoError::MissingRequiredTable(EMAIL_ADDRESS_TABLE.name));
    }

    for column in EMAIL_ADDRESS_TABLE.column_names() {
        if !table_has_column(conn, EMAIL_ADDRESS_TABLE.name, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: EMAIL_ADDRESS_TABLE.name,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
