//! Pure statement builders.
//!
//! # Responsibility
//! - Turn typed specs, predicates and value lists into SQL text plus an
//!   ordered list of bound parameters.
//!
//! # Invariants
//! - Only canonicalized identifiers are interpolated into SQL text.
//! - Values are always bound as `?` parameters, never formatted into SQL.
//! - An equality predicate with zero entries renders no `WHERE` clause.

use super::spec::{canonical_ident, TableSpec};
use super::{QueryError, QueryResult};
use rusqlite::types::Value;
use std::collections::BTreeSet;
use std::str::FromStr;

/// SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Row filter for select/update/delete/count.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Predicate {
    /// No filter.
    #[default]
    All,
    /// Conjunction of `column = value` tests. Empty means `All`.
    Eq(Vec<(String, Value)>),
    /// Trusted boolean expression, inserted verbatim. Never build this from
    /// untrusted input.
    Raw(String),
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(vec![(column.into(), value.into())])
    }

    /// Adds one more equality test. Turns `All` into an `Eq` filter.
    ///
    /// `Raw` predicates are left unchanged; compose them by hand instead.
    pub fn and(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        match self {
            Self::All => Self::eq(column, value),
            Self::Eq(mut tests) => {
                tests.push((column.into(), value.into()));
                Self::Eq(tests)
            }
            raw @ Self::Raw(_) => raw,
        }
    }

    fn render(&self, sql: &mut String, params: &mut Vec<Value>) -> QueryResult<()> {
        match self {
            Self::All => Ok(()),
            Self::Eq(tests) if tests.is_empty() => Ok(()),
            Self::Eq(tests) => {
                let mut clauses = Vec::with_capacity(tests.len());
                for (column, value) in tests {
                    let column = canonical_ident(column)?;
                    if *value == Value::Null {
                        clauses.push(format!("{column} IS NULL"));
                    } else {
                        clauses.push(format!("{column} = ?"));
                        params.push(value.clone());
                    }
                }
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
                Ok(())
            }
            Self::Raw(expression) => {
                sql.push_str(" WHERE (");
                sql.push_str(expression);
                sql.push(')');
                Ok(())
            }
        }
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: String,
    pub descending: bool,
}

impl OrderTerm {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    fn render(&self) -> QueryResult<String> {
        let column = canonical_ident(&self.column)?;
        let direction = if self.descending { "DESC" } else { "ASC" };
        Ok(format!("{column} {direction}"))
    }
}

impl FromStr for OrderTerm {
    type Err = QueryError;

    /// Parses `column`, `column ASC` or `column DESC` (any case).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.split_whitespace();
        let column = parts
            .next()
            .ok_or_else(|| QueryError::InvalidOrder(value.to_string()))?;
        let descending = match parts.next() {
            None => false,
            Some(direction) if direction.eq_ignore_ascii_case("asc") => false,
            Some(direction) if direction.eq_ignore_ascii_case("desc") => true,
            Some(_) => return Err(QueryError::InvalidOrder(value.to_string())),
        };
        if parts.next().is_some() {
            return Err(QueryError::InvalidOrder(value.to_string()));
        }

        Ok(Self {
            column: canonical_ident(column)?,
            descending,
        })
    }
}

/// Options for `select_rows`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    /// Empty selects all columns.
    pub columns: Vec<String>,
    pub predicate: Predicate,
    /// Empty leaves row order unspecified.
    pub order_by: Vec<OrderTerm>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl SelectQuery {
    /// All columns, all rows, engine order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn order_by(mut self, term: OrderTerm) -> Self {
        self.order_by.push(term);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

pub fn create_table(spec: &TableSpec) -> QueryResult<Statement> {
    spec.validate()?;

    let table = canonical_ident(&spec.name)?;
    let mut definitions = Vec::with_capacity(spec.columns.len() + spec.foreign_keys.len());

    for column in &spec.columns {
        let name = canonical_ident(&column.name)?;
        let mut definition = format!("{name} {}", column.column_type.as_sql());
        match &spec.primary_key {
            Some(key) if spec.is_primary_key(&name) => {
                definition.push_str(" PRIMARY KEY");
                if key.auto_increment {
                    definition.push_str(" AUTOINCREMENT");
                }
                definition.push_str(" NOT NULL");
            }
            _ => {
                for constraint in &column.constraints {
                    definition.push(' ');
                    definition.push_str(constraint.as_sql());
                }
            }
        }
        definitions.push(definition);
    }

    for foreign_key in &spec.foreign_keys {
        definitions.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}",
            canonical_ident(&foreign_key.column)?,
            canonical_ident(&foreign_key.references)?
        ));
    }

    Ok(Statement {
        sql: format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n    {}\n);",
            definitions.join(",\n    ")
        ),
        params: Vec::new(),
    })
}

pub fn drop_table(table: &str) -> QueryResult<Statement> {
    Ok(Statement {
        sql: format!("DROP TABLE IF EXISTS {};", canonical_ident(table)?),
        params: Vec::new(),
    })
}

pub fn insert(table: &str, values: &[(&str, Value)]) -> QueryResult<Statement> {
    let table = canonical_ident(table)?;
    if values.is_empty() {
        return Ok(Statement {
            sql: format!("INSERT INTO {table} DEFAULT VALUES;"),
            params: Vec::new(),
        });
    }

    let columns = canonical_columns(values)?;
    let placeholders = vec!["?"; columns.len()].join(", ");
    Ok(Statement {
        sql: format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders});",
            columns.join(", ")
        ),
        params: values.iter().map(|(_, value)| value.clone()).collect(),
    })
}

pub fn select(table: &str, query: &SelectQuery) -> QueryResult<Statement> {
    let table = canonical_ident(table)?;
    let projection = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query
            .columns
            .iter()
            .map(|column| canonical_ident(column))
            .collect::<QueryResult<Vec<_>>>()?
            .join(", ")
    };

    let mut sql = format!("SELECT {projection} FROM {table}");
    let mut params = Vec::new();
    query.predicate.render(&mut sql, &mut params)?;

    if !query.order_by.is_empty() {
        let terms = query
            .order_by
            .iter()
            .map(OrderTerm::render)
            .collect::<QueryResult<Vec<_>>>()?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        params.push(Value::Integer(i64::from(limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            params.push(Value::Integer(i64::from(query.offset)));
        }
    } else if query.offset > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        params.push(Value::Integer(i64::from(query.offset)));
    }

    sql.push(';');
    Ok(Statement { sql, params })
}

pub fn update(
    table: &str,
    values: &[(&str, Value)],
    predicate: &Predicate,
) -> QueryResult<Statement> {
    let table = canonical_ident(table)?;
    if values.is_empty() {
        return Err(QueryError::EmptyAssignments);
    }

    let assignments = canonical_columns(values)?
        .into_iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>();
    let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
    let mut params: Vec<Value> = values.iter().map(|(_, value)| value.clone()).collect();
    predicate.render(&mut sql, &mut params)?;
    sql.push(';');
    Ok(Statement { sql, params })
}

pub fn delete(table: &str, predicate: &Predicate) -> QueryResult<Statement> {
    let mut sql = format!("DELETE FROM {}", canonical_ident(table)?);
    let mut params = Vec::new();
    predicate.render(&mut sql, &mut params)?;
    sql.push(';');
    Ok(Statement { sql, params })
}

pub fn count(table: &str, predicate: &Predicate) -> QueryResult<Statement> {
    let mut sql = format!("SELECT COUNT(*) FROM {}", canonical_ident(table)?);
    let mut params = Vec::new();
    predicate.render(&mut sql, &mut params)?;
    sql.push(';');
    Ok(Statement { sql, params })
}

fn canonical_columns(values: &[(&str, Value)]) -> QueryResult<Vec<String>> {
    let mut seen = BTreeSet::new();
    let mut columns = Vec::with_capacity(values.len());
    for (column, _) in values {
        let column = canonical_ident(column)?;
        if !seen.insert(column.clone()) {
            return Err(QueryError::DuplicateColumn(column));
        }
        columns.push(column);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::{
        count, create_table, delete, insert, select, update, OrderTerm, Predicate, SelectQuery,
    };
    use crate::query::spec::{ColumnSpec, ColumnType, ForeignKey, PrimaryKey, TableSpec};
    use crate::query::QueryError;
    use rusqlite::types::Value;

    #[test]
    fn create_table_renders_keys_and_constraints() {
        let spec = TableSpec::new("Notes")
            .column(ColumnSpec::new("ID", ColumnType::Integer).not_null())
            .column(ColumnSpec::new("owner", ColumnType::Text).not_null())
            .column(ColumnSpec::new("body", ColumnType::Text))
            .primary_key(PrimaryKey::auto_increment("id"))
            .foreign_key(ForeignKey::new("Owner", "Owners"));

        let statement = create_table(&spec).unwrap();
        assert_eq!(
            statement.sql,
            "CREATE TABLE IF NOT EXISTS notes (\n    \
             id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,\n    \
             owner TEXT NOT NULL,\n    \
             body TEXT,\n    \
             FOREIGN KEY (owner) REFERENCES owners\n);"
        );
        assert!(statement.params.is_empty());
    }

    #[test]
    fn insert_binds_every_value() {
        let statement = insert(
            "Meetings",
            &[("ID", Value::from("m1".to_string())), ("title", Value::Null)],
        )
        .unwrap();
        assert_eq!(statement.sql, "INSERT INTO meetings (id, title) VALUES (?, ?);");
        assert_eq!(
            statement.params,
            vec![Value::Text("m1".to_string()), Value::Null]
        );
    }

    #[test]
    fn insert_rejects_duplicate_columns_across_case() {
        let err = insert(
            "t",
            &[("Title", Value::Integer(1)), ("TITLE", Value::Integer(2))],
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::DuplicateColumn(ref column) if column == "title"));
    }

    #[test]
    fn select_renders_filters_order_and_page() {
        let query = SelectQuery::all()
            .columns(["Point"])
            .filter(Predicate::eq("meeting_id", "m1".to_string()))
            .order_by(OrderTerm::asc("point_order"))
            .order_by(OrderTerm::desc("id"))
            .limit(5)
            .offset(10);

        let statement = select("key_points", &query).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT point FROM key_points WHERE meeting_id = ? ORDER BY point_order ASC, id DESC LIMIT ? OFFSET ?;"
        );
        assert_eq!(
            statement.params,
            vec![
                Value::Text("m1".to_string()),
                Value::Integer(5),
                Value::Integer(10)
            ]
        );
    }

    #[test]
    fn select_with_offset_only_uses_unbounded_limit() {
        let statement = select("t", &SelectQuery::all().offset(3)).unwrap();
        assert_eq!(statement.sql, "SELECT * FROM t LIMIT -1 OFFSET ?;");
    }

    #[test]
    fn empty_equality_predicate_renders_no_where_clause() {
        let empty = Predicate::Eq(Vec::new());
        let statement = select("t", &SelectQuery::all().filter(empty.clone())).unwrap();
        assert_eq!(statement.sql, "SELECT * FROM t;");
        assert_eq!(delete("t", &empty).unwrap().sql, "DELETE FROM t;");
    }

    #[test]
    fn null_equality_renders_is_null() {
        let predicate = Predicate::eq("deadline", Value::Null).and("task", "x".to_string());
        let statement = count("action_items", &predicate).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) FROM action_items WHERE deadline IS NULL AND task = ?;"
        );
        assert_eq!(statement.params, vec![Value::Text("x".to_string())]);
    }

    #[test]
    fn raw_predicate_is_wrapped() {
        let statement = delete("t", &Predicate::Raw("a > 1 OR b < 2".to_string())).unwrap();
        assert_eq!(statement.sql, "DELETE FROM t WHERE (a > 1 OR b < 2);");
    }

    #[test]
    fn update_orders_assignment_params_before_filter_params() {
        let statement = update(
            "meetings",
            &[("Title", Value::from("new".to_string()))],
            &Predicate::eq("id", "m1".to_string()),
        )
        .unwrap();
        assert_eq!(statement.sql, "UPDATE meetings SET title = ? WHERE id = ?;");
        assert_eq!(
            statement.params,
            vec![Value::Text("new".to_string()), Value::Text("m1".to_string())]
        );
    }

    #[test]
    fn update_without_values_is_rejected() {
        assert!(matches!(
            update("t", &[], &Predicate::All),
            Err(QueryError::EmptyAssignments)
        ));
    }

    #[test]
    fn order_term_parses_direction_suffix() {
        assert_eq!(
            "Created_At DESC".parse::<OrderTerm>().unwrap(),
            OrderTerm::desc("created_at")
        );
        assert_eq!("id".parse::<OrderTerm>().unwrap(), OrderTerm::asc("id"));
        assert!(matches!(
            "id sideways".parse::<OrderTerm>(),
            Err(QueryError::InvalidOrder(_))
        ));
    }
}
