//! SQLite storage bootstrap and schema initialization entry points.
//!
//! # Responsibility
//! - Open, configure and close the single SQLite connection used by core.
//! - Ensure the four meeting tables exist before any data access.
//!
//! # Invariants
//! - Callers own the connection handle; there is no process-wide singleton.
//! - Core code must not read/write meeting data before `ensure_schema` succeeds.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{close_db, open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Schema bootstrap failed for one of the fixed tables.
    SchemaInit {
        table: &'static str,
        message: String,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaInit { table, message } => {
                write!(f, "failed to initialize table `{table}`: {message}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaInit { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
