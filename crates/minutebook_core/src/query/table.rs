//! Statement execution against a borrowed connection.
//!
//! All functions take `&Connection`, so they run unchanged inside a
//! `Transaction` (which derefs to `Connection`).

use super::spec::TableSpec;
use super::statement::{self, Predicate, SelectQuery, Statement};
use super::{QueryResult, Row};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// Creates the table when absent. Spec errors are raised before any SQL runs.
pub fn define_table(conn: &Connection, spec: &TableSpec) -> QueryResult<()> {
    let statement = statement::create_table(spec)?;
    execute(conn, &statement)?;
    Ok(())
}

/// Drops the table when present; a missing table is a no-op.
pub fn drop_table(conn: &Connection, table: &str) -> QueryResult<()> {
    execute(conn, &statement::drop_table(table)?)?;
    Ok(())
}

/// Inserts one row and returns its SQLite rowid.
///
/// Columns not named in `values` take their declared default or NULL.
pub fn insert_row(conn: &Connection, table: &str, values: &[(&str, Value)]) -> QueryResult<i64> {
    execute(conn, &statement::insert(table, values)?)?;
    Ok(conn.last_insert_rowid())
}

/// Returns matching rows keyed by canonical column name. No match is an
/// empty vector.
pub fn select_rows(conn: &Connection, table: &str, query: &SelectQuery) -> QueryResult<Vec<Row>> {
    let statement = statement::select(table, query)?;
    debug!("event=query_select module=query table={table}");

    let mut stmt = conn.prepare(&statement.sql)?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_ascii_lowercase)
        .collect();

    let mut rows = stmt.query(params_from_iter(statement.params.iter()))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (index, name) in names.iter().enumerate() {
            record.insert(name.clone(), row.get::<_, Value>(index)?);
        }
        records.push(record);
    }

    Ok(records)
}

/// Updates matching rows and returns how many changed.
pub fn update_rows(
    conn: &Connection,
    table: &str,
    values: &[(&str, Value)],
    predicate: &Predicate,
) -> QueryResult<usize> {
    execute(conn, &statement::update(table, values, predicate)?)
}

/// Deletes matching rows and returns how many were removed.
/// `Predicate::All` (or an empty `Eq`) clears the table.
pub fn delete_rows(conn: &Connection, table: &str, predicate: &Predicate) -> QueryResult<usize> {
    execute(conn, &statement::delete(table, predicate)?)
}

pub fn count_rows(conn: &Connection, table: &str, predicate: &Predicate) -> QueryResult<u64> {
    let statement = statement::count(table, predicate)?;
    let count: i64 = conn.query_row(
        &statement.sql,
        params_from_iter(statement.params.iter()),
        |row| row.get(0),
    )?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// Probes the schema catalog for `table` (canonical name).
pub fn table_exists(conn: &Connection, table: &str) -> QueryResult<bool> {
    let table = super::spec::canonical_ident(table)?;
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn execute(conn: &Connection, statement: &Statement) -> QueryResult<usize> {
    let changed = conn.execute(&statement.sql, params_from_iter(statement.params.iter()))?;
    Ok(changed)
}
