//! Generic parameterized query builder over SQLite.
//!
//! # Responsibility
//! - Describe tables as typed values (`TableSpec`) instead of ad-hoc maps.
//! - Build CREATE/INSERT/SELECT/UPDATE/DELETE statements from data and
//!   execute them on a caller-provided connection.
//!
//! # Invariants
//! - Identifiers are canonicalized to lower case before reaching SQL.
//! - Values are always bound parameters.
//! - Engine errors are surfaced as-is; constraint violations are reported
//!   as `QueryError::Constraint`.
//!
//! This layer knows nothing about meetings.

use crate::db::DbError;
use rusqlite::types::Value;
use rusqlite::ErrorCode;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod spec;
pub mod statement;
pub mod table;

pub use spec::{
    canonical_ident, ColumnConstraint, ColumnSpec, ColumnType, ForeignKey, PrimaryKey, TableSpec,
};
pub use statement::{OrderTerm, Predicate, SelectQuery, Statement};
pub use table::{
    count_rows, define_table, delete_rows, drop_table, insert_row, select_rows, table_exists,
    update_rows,
};

pub type QueryResult<T> = Result<T, QueryError>;

/// One selected row, keyed by canonical (lower-case) column name.
pub type Row = BTreeMap<String, Value>;

/// Malformed table description, raised before any SQL runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    NoColumns { table: String },
    DuplicateColumn { table: String, column: String },
    MissingPrimaryKey { table: String, column: String },
    MissingForeignKeyColumn { table: String, column: String },
    AutoIncrementRequiresInteger { table: String, column: String },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoColumns { table } => write!(f, "table `{table}` declares no columns"),
            Self::DuplicateColumn { table, column } => {
                write!(f, "table `{table}` declares column `{column}` twice")
            }
            Self::MissingPrimaryKey { table, column } => write!(
                f,
                "primary key `{column}` is not a declared column of `{table}`"
            ),
            Self::MissingForeignKeyColumn { table, column } => write!(
                f,
                "foreign key column `{column}` is not a declared column of `{table}`"
            ),
            Self::AutoIncrementRequiresInteger { table, column } => write!(
                f,
                "auto-increment key `{table}.{column}` must be declared INTEGER"
            ),
        }
    }
}

impl Error for SchemaError {}

#[derive(Debug)]
pub enum QueryError {
    Schema(SchemaError),
    /// Uniqueness, not-null or foreign-key violation reported by SQLite.
    Constraint {
        message: String,
    },
    InvalidIdentifier(String),
    InvalidOrder(String),
    DuplicateColumn(String),
    /// `UPDATE` with nothing to set.
    EmptyAssignments,
    /// A selected value is missing or has an unexpected storage class.
    InvalidData(String),
    Db(DbError),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema(err) => write!(f, "{err}"),
            Self::Constraint { message } => write!(f, "constraint violation: {message}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid SQL identifier `{name}`"),
            Self::InvalidOrder(term) => write!(f, "invalid order term `{term}`"),
            Self::DuplicateColumn(column) => write!(f, "column `{column}` given more than once"),
            Self::EmptyAssignments => write!(f, "update requires at least one column value"),
            Self::InvalidData(message) => write!(f, "invalid row data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Schema(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SchemaError> for QueryError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<DbError> for QueryError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            if failure.code == ErrorCode::ConstraintViolation {
                return Self::Constraint {
                    message: message.clone().unwrap_or_else(|| failure.to_string()),
                };
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Reads a non-null TEXT column.
pub fn row_text(row: &Row, column: &str) -> QueryResult<String> {
    match row.get(column) {
        Some(Value::Text(value)) => Ok(value.clone()),
        other => Err(unexpected(column, "text", other)),
    }
}

/// Reads a TEXT column that may be NULL.
pub fn row_opt_text(row: &Row, column: &str) -> QueryResult<Option<String>> {
    match row.get(column) {
        Some(Value::Text(value)) => Ok(Some(value.clone())),
        Some(Value::Null) => Ok(None),
        other => Err(unexpected(column, "text or null", other)),
    }
}

pub fn row_integer(row: &Row, column: &str) -> QueryResult<i64> {
    match row.get(column) {
        Some(Value::Integer(value)) => Ok(*value),
        other => Err(unexpected(column, "integer", other)),
    }
}

fn unexpected(column: &str, expected: &str, found: Option<&Value>) -> QueryError {
    let found = match found {
        None => "missing column",
        Some(Value::Null) => "null",
        Some(Value::Integer(_)) => "integer",
        Some(Value::Real(_)) => "real",
        Some(Value::Text(_)) => "text",
        Some(Value::Blob(_)) => "blob",
    };
    QueryError::InvalidData(format!("column `{column}` expected {expected}, found {found}"))
}
