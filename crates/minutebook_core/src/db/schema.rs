//! Fixed table layout for meeting aggregates.
//!
//! # Invariants
//! - `meetings` is the only parent; every child table carries a
//!   `meeting_id` foreign key and a dense zero-based `*_order` column.
//! - `ensure_schema` is idempotent and defines parents before children.

use crate::db::{DbError, DbResult};
use crate::query::{
    define_table, select_rows, ColumnSpec, ColumnType, ForeignKey, PrimaryKey, SelectQuery,
    TableSpec,
};
use log::info;
use rusqlite::Connection;

pub const MEETINGS: &str = "meetings";
pub const KEY_POINTS: &str = "key_points";
pub const ACTION_ITEMS: &str = "action_items";
pub const DECISIONS: &str = "decisions";

pub const ID: &str = "id";
pub const MEETING_ID: &str = "meeting_id";
pub const CREATED_AT: &str = "created_at";
pub const TITLE: &str = "title";
pub const TRANSCRIPT: &str = "transcript";
pub const SUMMARY_HEADING: &str = "summary_heading";
pub const POINT: &str = "point";
pub const POINT_ORDER: &str = "point_order";
pub const ASSIGNEE: &str = "assignee";
pub const TASK: &str = "task";
pub const DEADLINE: &str = "deadline";
pub const ITEM_ORDER: &str = "item_order";
pub const DECISION: &str = "decision";
pub const DECISION_ORDER: &str = "decision_order";

pub fn meetings_table() -> TableSpec {
    TableSpec::new(MEETINGS)
        .column(ColumnSpec::new(ID, ColumnType::Text).not_null())
        .column(ColumnSpec::new(CREATED_AT, ColumnType::Text).not_null())
        .column(ColumnSpec::new(TITLE, ColumnType::Text).not_null())
        .column(ColumnSpec::new(TRANSCRIPT, ColumnType::Text))
        .column(ColumnSpec::new(SUMMARY_HEADING, ColumnType::Text))
        .primary_key(PrimaryKey::new(ID))
}

pub fn key_points_table() -> TableSpec {
    child_table(KEY_POINTS)
        .column(ColumnSpec::new(POINT, ColumnType::Text).not_null())
        .column(ColumnSpec::new(POINT_ORDER, ColumnType::Integer).not_null())
}

pub fn action_items_table() -> TableSpec {
    child_table(ACTION_ITEMS)
        .column(ColumnSpec::new(ASSIGNEE, ColumnType::Text))
        .column(ColumnSpec::new(TASK, ColumnType::Text).not_null())
        .column(ColumnSpec::new(DEADLINE, ColumnType::Text))
        .column(ColumnSpec::new(ITEM_ORDER, ColumnType::Integer).not_null())
}

pub fn decisions_table() -> TableSpec {
    child_table(DECISIONS)
        .column(ColumnSpec::new(DECISION, ColumnType::Text).not_null())
        .column(ColumnSpec::new(DECISION_ORDER, ColumnType::Integer).not_null())
}

const TABLES: [(&str, fn() -> TableSpec); 4] = [
    (MEETINGS, meetings_table),
    (KEY_POINTS, key_points_table),
    (ACTION_ITEMS, action_items_table),
    (DECISIONS, decisions_table),
];

/// All four tables, parent first.
pub fn all_tables() -> Vec<TableSpec> {
    TABLES.iter().map(|(_, spec)| spec()).collect()
}

/// Creates any missing meeting table.
///
/// Each table is probed with an unfiltered select; a failing probe means the
/// table has to be defined. Existing tables are left untouched.
pub fn ensure_schema(conn: &Connection) -> DbResult<()> {
    for (table, spec) in TABLES {
        if select_rows(conn, table, &SelectQuery::all().limit(1)).is_ok() {
            continue;
        }

        define_table(conn, &spec()).map_err(|err| DbError::SchemaInit {
            table,
            message: err.to_string(),
        })?;
        info!("event=schema_init module=db status=created table={table}");
    }
    Ok(())
}

fn child_table(name: &str) -> TableSpec {
    TableSpec::new(name)
        .column(ColumnSpec::new(ID, ColumnType::Integer))
        .column(ColumnSpec::new(MEETING_ID, ColumnType::Text).not_null())
        .primary_key(PrimaryKey::auto_increment(ID))
        .foreign_key(ForeignKey::new(MEETING_ID, MEETINGS))
}
