//! Explicit table definitions.
//!
//! # Responsibility
//! - Describe every table as a plain value instead of deriving it from types.
//! - Render idempotent DDL from those values.
//! - Provide the column list that repositories verify on connect.
//!
//! # Invariants
//! - Rendered DDL always uses `CREATE TABLE IF NOT EXISTS`.
//! - Storage checks mirror `model::email_address::validate_address`.

/// One column of a table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    /// SQLite type affinity, e.g. `INTEGER` or `TEXT`.
    pub sql_type: &'static str,
    /// Trailing column constraints, may be empty.
    pub constraints: &'static str,
}

/// Declarative description of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Table-level `CHECK` expressions.
    pub checks: &'static [&'static str],
}

impl TableSchema {
    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|column| column.name)
    }
}

pub const EMAIL_ADDRESS_TABLE_NAME: &str = "emailaddress";

/// Storage shape of `EmailAddress`.
pub const EMAIL_ADDRESS_TABLE: TableSchema = TableSchema {
    name: EMAIL_ADDRESS_TABLE_NAME,
    columns: &[
        ColumnSpec {
            name: "id",
            sql_type: "INTEGER",
            constraints: "PRIMARY KEY AUTOINCREMENT",
        },
        ColumnSpec {
            name: "email",
            sql_type: "TEXT",
            constraints: "NOT NULL",
        },
        ColumnSpec {
            name: "backup_email",
            sql_type: "TEXT",
            constraints: "NOT NULL",
        },
    ],
    checks: &["instr(email, '@') > 0", "instr(backup_email, '@') > 0"],
};

/// All tables owned by this crate, in creation order.
pub const TABLES: &[TableSchema] = &[EMAIL_ADDRESS_TABLE];

/// Renders a `CREATE TABLE IF NOT EXISTS` statement for `table`.
pub fn create_table_sql(table: &TableSchema) -> String {
    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            if column.constraints.is_empty() {
                format!("{} {}", column.name, column.sql_type)
            } else {
                format!("{} {} {}", column.name, column.sql_type, column.constraints)
            }
        })
        .collect();
    parts.extend(table.checks.iter().map(|check| format!("CHECK ({check})")));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        table.name,
        parts.join(",\n    ")
    )
}

/// Renders DDL for every table in `TABLES`.
pub fn create_all_sql() -> String {
    TABLES
        .iter()
        .map(create_table_sql)
        .collect::<Vec<_>>()
        .join("\n")
}
