//! Typed table descriptions consumed by the statement builder.
//!
//! # Invariants
//! - Every identifier is canonicalized exactly once, by `canonical_ident`.
//! - A `TableSpec` only reaches SQL after `validate` succeeds.

use super::{QueryError, QueryResult, SchemaError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid identifier regex"));

/// Normalizes a table or column name to its canonical lower-case form.
///
/// Names are matched case-insensitively everywhere in the query layer
/// because this is the only place they are turned into SQL text.
///
/// # Errors
/// - `QueryError::InvalidIdentifier` when the name is not a plain
///   `[a-z_][a-z0-9_]*` identifier after normalization.
pub fn canonical_ident(name: &str) -> QueryResult<String> {
    let normalized = name.trim().to_ascii_lowercase();
    if IDENT_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}

/// SQLite storage class used for a column declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Blob,
    Numeric,
}

impl ColumnType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    NotNull,
    Unique,
}

impl ColumnConstraint {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::NotNull => "NOT NULL",
            Self::Unique => "UNIQUE",
        }
    }
}

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            constraints: Vec::new(),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.push_constraint(ColumnConstraint::NotNull);
        self
    }

    pub fn unique(mut self) -> Self {
        self.push_constraint(ColumnConstraint::Unique);
        self
    }

    fn push_constraint(&mut self, constraint: ColumnConstraint) {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
    }
}

/// Primary-key declaration. The engine adds `NOT NULL` and uniqueness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub column: String,
    /// Only valid for `INTEGER` keys; SQLite then assigns row ids.
    pub auto_increment: bool,
}

impl PrimaryKey {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            auto_increment: false,
        }
    }

    pub fn auto_increment(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            auto_increment: true,
        }
    }
}

/// `(column, referenced table)` pair. The reference binds to the
/// referenced table's primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub references: String,
}

impl ForeignKey {
    pub fn new(column: impl Into<String>, references: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            references: references.into(),
        }
    }
}

/// Full description of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Option<PrimaryKey>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, primary_key: PrimaryKey) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Checks key references against declared columns.
    ///
    /// # Errors
    /// - `SchemaError` for a malformed spec; identifier errors surface as
    ///   `QueryError::InvalidIdentifier`.
    pub fn validate(&self) -> QueryResult<()> {
        let table = canonical_ident(&self.name)?;
        if self.columns.is_empty() {
            return Err(SchemaError::NoColumns { table }.into());
        }

        let mut declared = BTreeSet::new();
        for column in &self.columns {
            let name = canonical_ident(&column.name)?;
            if !declared.insert(name.clone()) {
                return Err(SchemaError::DuplicateColumn {
                    table,
                    column: name,
                }
                .into());
            }
        }

        if let Some(primary_key) = &self.primary_key {
            let column = canonical_ident(&primary_key.column)?;
            let Some(spec) = self.find_column(&column) else {
                return Err(SchemaError::MissingPrimaryKey { table, column }.into());
            };
            if primary_key.auto_increment && spec.column_type != ColumnType::Integer {
                return Err(SchemaError::AutoIncrementRequiresInteger { table, column }.into());
            }
        }

        for foreign_key in &self.foreign_keys {
            let column = canonical_ident(&foreign_key.column)?;
            canonical_ident(&foreign_key.references)?;
            if !declared.contains(&column) {
                return Err(SchemaError::MissingForeignKeyColumn { table, column }.into());
            }
        }

        Ok(())
    }

    /// Returns whether `column` is this table's primary key (case-insensitive).
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.as_ref().is_some_and(|key| {
            key.column.trim().eq_ignore_ascii_case(column.trim())
        })
    }

    fn find_column(&self, canonical: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|column| column.name.trim().eq_ignore_ascii_case(canonical))
    }
}
