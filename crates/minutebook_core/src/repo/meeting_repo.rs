//! Meeting aggregate repository over the four meeting tables.
//!
//! # Responsibility
//! - Decompose a `Meeting` into one `meetings` row plus ordered child rows.
//! - Reassemble aggregates from parent and child rows on read.
//! - Own cascading delete.
//!
//! # Invariants
//! - Every multi-statement write runs in one IMMEDIATE transaction; any
//!   failure rolls the whole aggregate operation back.
//! - Children are written after their parent and deleted before it.
//! - Child `*_order` values equal list indexes; reads reject gaps instead
//!   of masking them.

use crate::db::schema::{
    ACTION_ITEMS, ASSIGNEE, CREATED_AT, DEADLINE, DECISION, DECISIONS, DECISION_ORDER, ID,
    ITEM_ORDER, KEY_POINTS, MEETINGS, MEETING_ID, POINT, POINT_ORDER, SUMMARY_HEADING, TASK,
    TITLE, TRANSCRIPT,
};
use crate::model::field_path::MeetingPart;
use crate::model::meeting::{
    ActionItem, Meeting, MeetingId, MeetingValidationError, DEFAULT_ASSIGNEE,
};
use crate::query::{
    count_rows, delete_rows, insert_row, row_integer, row_opt_text, row_text, select_rows,
    table_exists, update_rows, OrderTerm, Predicate, QueryError, Row, SelectQuery,
};
use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for meeting persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(MeetingValidationError),
    Query(QueryError),
    NotFound(MeetingId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "meeting not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted meeting data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MeetingValidationError> for RepoError {
    fn from(value: MeetingValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<QueryError> for RepoError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Query(QueryError::from(value))
    }
}

/// Page and ordering options for listing meetings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingListQuery {
    pub limit: Option<u32>,
    pub offset: u32,
    /// `id ASC` is appended as a tie-breaker unless already present.
    pub order_by: Vec<OrderTerm>,
}

impl Default for MeetingListQuery {
    /// Newest first, no limit.
    fn default() -> Self {
        Self {
            limit: None,
            offset: 0,
            order_by: vec![OrderTerm::desc(CREATED_AT)],
        }
    }
}

impl MeetingListQuery {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
            ..Self::default()
        }
    }
}

/// Repository interface for meeting aggregate CRUD.
pub trait MeetingRepository {
    /// Writes the parent row and every child row; returns the id unchanged.
    fn save_meeting(&mut self, meeting: &Meeting) -> RepoResult<MeetingId>;
    /// Rewrites the parent row and all child rows of an existing meeting.
    fn update_meeting(&mut self, meeting: &Meeting) -> RepoResult<()>;
    /// Rewrites only the parent row or one child table's rows.
    fn persist_part(&mut self, meeting: &Meeting, part: MeetingPart) -> RepoResult<()>;
    fn get_meeting(&self, id: &str) -> RepoResult<Option<Meeting>>;
    fn list_meetings(&self, query: &MeetingListQuery) -> RepoResult<Vec<Meeting>>;
    fn count_meetings(&self) -> RepoResult<u64>;
    /// Deletes children then parent. Returns `false` when `id` was absent.
    fn delete_meeting(&mut self, id: &str) -> RepoResult<bool>;
}

const CHILD_PARTS: [MeetingPart; 3] = [
    MeetingPart::KeyPoints,
    MeetingPart::ActionItems,
    MeetingPart::Decisions,
];

/// SQLite-backed meeting repository.
pub struct SqliteMeetingRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteMeetingRepository<'conn> {
    /// Constructs a repository from a connection opened through `db::open_db*`.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        for table in [MEETINGS, KEY_POINTS, ACTION_ITEMS, DECISIONS] {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }

    /// Total child rows stored for `id` across all three child tables.
    pub fn child_row_count(&self, id: &str) -> RepoResult<u64> {
        let mut total = 0;
        for part in CHILD_PARTS {
            total += count_rows(self.conn, child_table(part), &by_meeting(id))?;
        }
        Ok(total)
    }

    fn write_in_tx(
        &mut self,
        event: &'static str,
        id: &str,
        write: impl FnOnce(&Connection) -> RepoResult<()>,
    ) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = run_in_tx(self.conn, write);

        match &result {
            Ok(()) => info!(
                "event={} module=repo status=ok meeting_id={} duration_ms={}",
                event,
                id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event={} module=repo status=error meeting_id={} duration_ms={} error={}",
                event,
                id,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

impl MeetingRepository for SqliteMeetingRepository<'_> {
    fn save_meeting(&mut self, meeting: &Meeting) -> RepoResult<MeetingId> {
        meeting.validate()?;

        self.write_in_tx("meeting_save", &meeting.id, |conn| {
            let mut values = vec![(ID, Value::Text(meeting.id.clone()))];
            values.extend(root_values(meeting));
            insert_row(conn, MEETINGS, &values)?;
            for part in CHILD_PARTS {
                insert_children(conn, meeting, part)?;
            }
            Ok(())
        })?;

        Ok(meeting.id.clone())
    }

    fn update_meeting(&mut self, meeting: &Meeting) -> RepoResult<()> {
        meeting.validate()?;

        self.write_in_tx("meeting_update", &meeting.id, |conn| {
            update_root(conn, meeting)?;
            for part in CHILD_PARTS {
                replace_children(conn, meeting, part)?;
            }
            Ok(())
        })
    }

    fn persist_part(&mut self, meeting: &Meeting, part: MeetingPart) -> RepoResult<()> {
        meeting.validate()?;

        self.write_in_tx("meeting_update", &meeting.id, |conn| match part {
            MeetingPart::Root => update_root(conn, meeting),
            child => {
                if count_rows(conn, MEETINGS, &by_id(&meeting.id))? == 0 {
                    return Err(RepoError::NotFound(meeting.id.clone()));
                }
                replace_children(conn, meeting, child)
            }
        })
    }

    fn get_meeting(&self, id: &str) -> RepoResult<Option<Meeting>> {
        let rows = select_rows(self.conn, MEETINGS, &SelectQuery::all().filter(by_id(id)))?;
        match rows.first() {
            Some(row) => Ok(Some(assemble_meeting(self.conn, row)?)),
            None => Ok(None),
        }
    }

    fn list_meetings(&self, query: &MeetingListQuery) -> RepoResult<Vec<Meeting>> {
        let mut select = SelectQuery {
            order_by: query.order_by.clone(),
            limit: query.limit,
            offset: query.offset,
            ..SelectQuery::all()
        };
        if !select
            .order_by
            .iter()
            .any(|term| term.column.eq_ignore_ascii_case(ID))
        {
            select.order_by.push(OrderTerm::asc(ID));
        }

        select_rows(self.conn, MEETINGS, &select)?
            .iter()
            .map(|row| assemble_meeting(self.conn, row))
            .collect()
    }

    fn count_meetings(&self) -> RepoResult<u64> {
        Ok(count_rows(self.conn, MEETINGS, &Predicate::All)?)
    }

    fn delete_meeting(&mut self, id: &str) -> RepoResult<bool> {
        let mut deleted = 0;
        self.write_in_tx("meeting_delete", id, |conn| {
            for part in CHILD_PARTS {
                delete_rows(conn, child_table(part), &by_meeting(id))?;
            }
            deleted = delete_rows(conn, MEETINGS, &by_id(id))?;
            Ok(())
        })?;
        Ok(deleted > 0)
    }
}

fn run_in_tx(
    conn: &mut Connection,
    write: impl FnOnce(&Connection) -> RepoResult<()>,
) -> RepoResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    write(&tx)?;
    tx.commit()?;
    Ok(())
}

fn by_id(id: &str) -> Predicate {
    Predicate::eq(ID, id.to_string())
}

fn by_meeting(id: &str) -> Predicate {
    Predicate::eq(MEETING_ID, id.to_string())
}

fn child_table(part: MeetingPart) -> &'static str {
    match part {
        MeetingPart::KeyPoints => KEY_POINTS,
        MeetingPart::ActionItems => ACTION_ITEMS,
        MeetingPart::Decisions | MeetingPart::Root => DECISIONS,
    }
}

fn order_column(part: MeetingPart) -> &'static str {
    match part {
        MeetingPart::KeyPoints => POINT_ORDER,
        MeetingPart::ActionItems => ITEM_ORDER,
        MeetingPart::Decisions | MeetingPart::Root => DECISION_ORDER,
    }
}

/// Parent columns except the immutable `id`.
fn root_values(meeting: &Meeting) -> Vec<(&'static str, Value)> {
    vec![
        (CREATED_AT, Value::Text(meeting.created_at.clone())),
        (TITLE, Value::Text(meeting.title.clone())),
        (TRANSCRIPT, Value::Text(meeting.transcript.clone())),
        (SUMMARY_HEADING, Value::Text(meeting.summary_heading.clone())),
    ]
}

fn update_root(conn: &Connection, meeting: &Meeting) -> RepoResult<()> {
    let changed = update_rows(conn, MEETINGS, &root_values(meeting), &by_id(&meeting.id))?;
    if changed == 0 {
        return Err(RepoError::NotFound(meeting.id.clone()));
    }
    Ok(())
}

fn replace_children(conn: &Connection, meeting: &Meeting, part: MeetingPart) -> RepoResult<()> {
    delete_rows(conn, child_table(part), &by_meeting(&meeting.id))?;
    insert_children(conn, meeting, part)
}

fn insert_children(conn: &Connection, meeting: &Meeting, part: MeetingPart) -> RepoResult<()> {
    let owner = Value::Text(meeting.id.clone());
    let rows: Vec<Vec<(&str, Value)>> = match part {
        MeetingPart::Root => return Ok(()),
        MeetingPart::KeyPoints => meeting
            .key_points
            .iter()
            .map(|point| vec![(POINT, Value::Text(point.clone()))])
            .collect(),
        MeetingPart::ActionItems => meeting
            .action_items
            .iter()
            .map(|item| {
                vec![
                    (ASSIGNEE, Value::Text(item.assignee.clone())),
                    (TASK, Value::Text(item.task.clone())),
                    (DEADLINE, item.deadline.clone().map_or(Value::Null, Value::Text)),
                ]
            })
            .collect(),
        MeetingPart::Decisions => meeting
            .decisions
            .iter()
            .map(|decision| vec![(DECISION, Value::Text(decision.clone()))])
            .collect(),
    };

    let table = child_table(part);
    for (index, mut values) in rows.into_iter().enumerate() {
        values.push((MEETING_ID, owner.clone()));
        values.push((order_column(part), Value::Integer(position_value(index)?)));
        insert_row(conn, table, &values)?;
    }
    Ok(())
}

fn assemble_meeting(conn: &Connection, row: &Row) -> RepoResult<Meeting> {
    let id = row_text(row, ID)?;

    let key_points = ordered_children(conn, &id, MeetingPart::KeyPoints)?
        .iter()
        .map(|child| row_text(child, POINT))
        .collect::<Result<Vec<_>, _>>()?;
    let action_items = ordered_children(conn, &id, MeetingPart::ActionItems)?
        .iter()
        .map(parse_action_item)
        .collect::<Result<Vec<_>, _>>()?;
    let decisions = ordered_children(conn, &id, MeetingPart::Decisions)?
        .iter()
        .map(|child| row_text(child, DECISION))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Meeting {
        created_at: row_text(row, CREATED_AT)?,
        title: row_text(row, TITLE)?,
        transcript: row_opt_text(row, TRANSCRIPT)?.unwrap_or_default(),
        summary_heading: row_opt_text(row, SUMMARY_HEADING)?.unwrap_or_default(),
        id,
        key_points,
        action_items,
        decisions,
    })
}

fn parse_action_item(row: &Row) -> Result<ActionItem, QueryError> {
    Ok(ActionItem {
        assignee: row_opt_text(row, ASSIGNEE)?
            .unwrap_or_else(|| DEFAULT_ASSIGNEE.to_string()),
        task: row_text(row, TASK)?,
        deadline: row_opt_text(row, DEADLINE)?,
    })
}

/// Child rows of one table for `id`, ordered by position, checked dense.
fn ordered_children(conn: &Connection, id: &str, part: MeetingPart) -> RepoResult<Vec<Row>> {
    let table = child_table(part);
    let order = order_column(part);
    let rows = select_rows(
        conn,
        table,
        &SelectQuery::all()
            .filter(by_meeting(id))
            .order_by(OrderTerm::asc(order)),
    )?;

    for (index, row) in rows.iter().enumerate() {
        let position = row_integer(row, order)?;
        if position != position_value(index)? {
            return Err(RepoError::InvalidData(format!(
                "{table}.{order} for meeting `{id}` is {position} at list index {index}"
            )));
        }
    }
    Ok(rows)
}

fn position_value(index: usize) -> RepoResult<i64> {
    i64::try_from(index)
        .map_err(|_| RepoError::InvalidData(format!("list index {index} exceeds i64 range")))
}

#[cfg(test)]
mod tests {
    use super::{MeetingListQuery, OrderTerm};

    #[test]
    fn default_list_query_is_newest_first_without_limit() {
        let query = MeetingListQuery::default();
        assert_eq!(query.order_by, vec![OrderTerm::desc("created_at")]);
        assert_eq!(query.limit, None);
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn page_keeps_default_order() {
        let query = MeetingListQuery::page(5, 10);
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, 10);
        assert_eq!(query.order_by, MeetingListQuery::default().order_by);
    }
}
