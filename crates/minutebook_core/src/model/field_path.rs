//! Path-based edits on a loaded meeting.
//!
//! # Responsibility
//! - Address one scalar field, one list element, or one key of one
//!   action item inside a `Meeting`.
//! - Validate the path against the aggregate's shape before mutating.
//!
//! # Invariants
//! - A failed validation leaves the meeting untouched.
//! - `id` is never addressable for writes.

use super::meeting::{canonical_timestamp, Meeting};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Address of a value inside a meeting aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// Top-level scalar, e.g. `title`.
    ScalarField(String),
    /// Element of a list of strings, e.g. `key_points[1]`.
    ListElement(String, usize),
    /// Key of an element of a list of records, e.g. `action_items[0].task`.
    MapField(String, usize, String),
}

/// Replacement value for an addressed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// Only accepted by optional fields (`deadline`).
    Null,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

/// Storage unit that has to be rewritten after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingPart {
    /// The `meetings` row.
    Root,
    KeyPoints,
    ActionItems,
    Decisions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressingError {
    UnknownField(String),
    ImmutableField(String),
    /// Path arity does not match the field's shape.
    WrongShape {
        field: String,
        expected: &'static str,
    },
    IndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },
    UnknownKey {
        field: String,
        key: String,
    },
    /// `Null` given for a required field.
    NullNotAllowed(String),
    InvalidValue {
        field: String,
        message: String,
    },
}

impl Display for AddressingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField(field) => write!(f, "unknown meeting field `{field}`"),
            Self::ImmutableField(field) => write!(f, "meeting field `{field}` cannot be changed"),
            Self::WrongShape { field, expected } => {
                write!(f, "field `{field}` must be addressed as {expected}")
            }
            Self::IndexOutOfRange { field, index, len } => write!(
                f,
                "index {index} is out of range for `{field}` with {len} elements"
            ),
            Self::UnknownKey { field, key } => write!(f, "`{field}` elements have no key `{key}`"),
            Self::NullNotAllowed(field) => write!(f, "field `{field}` cannot be null"),
            Self::InvalidValue { field, message } => {
                write!(f, "invalid value for `{field}`: {message}")
            }
        }
    }
}

impl Error for AddressingError {}

const SCALAR: &str = "a scalar field";
const LIST_ELEMENT: &str = "a list element (field, index)";
const MAP_FIELD: &str = "an element key (field, index, key)";

impl FieldPath {
    pub fn scalar(field: impl Into<String>) -> Self {
        Self::ScalarField(field.into())
    }

    pub fn element(field: impl Into<String>, index: usize) -> Self {
        Self::ListElement(field.into(), index)
    }

    pub fn key(field: impl Into<String>, index: usize, key: impl Into<String>) -> Self {
        Self::MapField(field.into(), index, key.into())
    }

    pub fn field(&self) -> &str {
        match self {
            Self::ScalarField(field)
            | Self::ListElement(field, _)
            | Self::MapField(field, _, _) => field,
        }
    }

    /// Checks the path and value against `meeting` without mutating it.
    pub fn validate(
        &self,
        meeting: &Meeting,
        value: &FieldValue,
    ) -> Result<MeetingPart, AddressingError> {
        match self {
            Self::ScalarField(field) => {
                let part = scalar_part(field)?;
                let text = required_text(field, value)?;
                if field == "created_at" {
                    canonical_created_at(text)?;
                }
                if field == "title" && text.trim().is_empty() {
                    return Err(AddressingError::InvalidValue {
                        field: field.clone(),
                        message: "title cannot be empty".to_string(),
                    });
                }
                Ok(part)
            }
            Self::ListElement(field, index) => {
                let (list, part) = match field.as_str() {
                    "key_points" => (&meeting.key_points, MeetingPart::KeyPoints),
                    "decisions" => (&meeting.decisions, MeetingPart::Decisions),
                    "action_items" => return Err(wrong_shape(field, MAP_FIELD)),
                    other => return Err(shape_or_unknown(other, SCALAR)),
                };
                check_index(field, *index, list.len())?;
                required_text(field, value)?;
                Ok(part)
            }
            Self::MapField(field, index, key) => {
                if field != "action_items" {
                    return Err(shape_or_unknown(field, list_shape(field)));
                }
                check_index(field, *index, meeting.action_items.len())?;
                match key.as_str() {
                    "assignee" | "task" => {
                        required_text(key, value)?;
                    }
                    "deadline" => {}
                    _ => {
                        return Err(AddressingError::UnknownKey {
                            field: field.clone(),
                            key: key.clone(),
                        })
                    }
                }
                Ok(MeetingPart::ActionItems)
            }
        }
    }

    /// Validates, then writes `value` into `meeting`.
    ///
    /// Returns the storage part that now differs from the persisted state.
    pub fn apply(
        &self,
        meeting: &mut Meeting,
        value: FieldValue,
    ) -> Result<MeetingPart, AddressingError> {
        let part = self.validate(meeting, &value)?;
        match (self, value) {
            (Self::ScalarField(field), FieldValue::Text(text)) => match field.as_str() {
                "created_at" => meeting.created_at = canonical_created_at(&text)?,
                "title" => meeting.title = text,
                "transcript" => meeting.transcript = text,
                _ => meeting.summary_heading = text,
            },
            (Self::ListElement(field, index), FieldValue::Text(text)) => {
                let list = if field == "key_points" {
                    &mut meeting.key_points
                } else {
                    &mut meeting.decisions
                };
                list[*index] = text;
            }
            (Self::MapField(_, index, key), value) => {
                let item = &mut meeting.action_items[*index];
                match (key.as_str(), value) {
                    ("deadline", value) => {
                        item.deadline = match value {
                            FieldValue::Text(text) => Some(text),
                            FieldValue::Null => None,
                        }
                    }
                    ("assignee", FieldValue::Text(text)) => item.assignee = text,
                    (_, FieldValue::Text(text)) => item.task = text,
                    (_, FieldValue::Null) => {
                        return Err(AddressingError::NullNotAllowed(key.clone()))
                    }
                }
            }
            (path, FieldValue::Null) => {
                return Err(AddressingError::NullNotAllowed(path.field().to_string()))
            }
        }
        Ok(part)
    }
}

fn canonical_created_at(text: &str) -> Result<String, AddressingError> {
    canonical_timestamp(text).map_err(|err| AddressingError::InvalidValue {
        field: "created_at".to_string(),
        message: err.to_string(),
    })
}

fn scalar_part(field: &str) -> Result<MeetingPart, AddressingError> {
    match field {
        "created_at" | "title" | "transcript" | "summary_heading" => Ok(MeetingPart::Root),
        "id" => Err(AddressingError::ImmutableField(field.to_string())),
        other => Err(shape_or_unknown(other, list_shape(other))),
    }
}

fn list_shape(field: &str) -> &'static str {
    if field == "action_items" {
        MAP_FIELD
    } else if field == "key_points" || field == "decisions" {
        LIST_ELEMENT
    } else {
        SCALAR
    }
}

/// `WrongShape` for known fields, `UnknownField` otherwise.
fn shape_or_unknown(field: &str, expected: &'static str) -> AddressingError {
    match field {
        "id" | "created_at" | "title" | "transcript" | "summary_heading" | "key_points"
        | "decisions" | "action_items" => wrong_shape(field, expected),
        other => AddressingError::UnknownField(other.to_string()),
    }
}

fn wrong_shape(field: &str, expected: &'static str) -> AddressingError {
    AddressingError::WrongShape {
        field: field.to_string(),
        expected,
    }
}

fn check_index(field: &str, index: usize, len: usize) -> Result<(), AddressingError> {
    if index < len {
        Ok(())
    } else {
        Err(AddressingError::IndexOutOfRange {
            field: field.to_string(),
            index,
            len,
        })
    }
}

fn required_text<'a>(field: &str, value: &'a FieldValue) -> Result<&'a str, AddressingError> {
    match value {
        FieldValue::Text(text) => Ok(text),
        FieldValue::Null => Err(AddressingError::NullNotAllowed(field.to_string())),
    }
}
