//! Meeting aggregate model.
//!
//! # Responsibility
//! - Define the meeting root record and its three ordered child collections.
//! - Define the structured summary consumed from the summarization step.
//!
//! # Invariants
//! - `id` is caller-assigned, non-empty and never changes after creation.
//! - `created_at` is a UTC RFC 3339 timestamp with second precision and a
//!   `Z` suffix, so stored text orders the same way as time.
//! - List order is meaningful and must survive persistence unchanged.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque, globally unique meeting identifier.
pub type MeetingId = String;

/// Assignee stored when the summary did not name one.
pub const DEFAULT_ASSIGNEE: &str = "Unassigned";

fn default_assignee() -> String {
    DEFAULT_ASSIGNEE.to_string()
}

/// One follow-up task extracted from a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(default = "default_assignee")]
    pub assignee: String,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub deadline: Option<String>,
}

impl ActionItem {
    pub fn new(
        assignee: impl Into<String>,
        task: impl Into<String>,
        deadline: Option<String>,
    ) -> Self {
        Self {
            assignee: assignee.into(),
            task: task.into(),
            deadline,
        }
    }

    /// Task with the default assignee and no deadline.
    pub fn unassigned(task: impl Into<String>) -> Self {
        Self::new(DEFAULT_ASSIGNEE, task, None)
    }
}

/// Structured output of the summarization step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSummary {
    #[serde(default)]
    pub summary_heading: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub decisions: Vec<String>,
}

impl MeetingSummary {
    /// Parses the summarizer's JSON payload. Missing lists become empty.
    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// Meeting aggregate: root fields plus three ordered child collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    /// RFC 3339 creation timestamp, e.g. `2024-11-24T12:00:00Z`.
    pub created_at: String,
    pub title: String,
    pub transcript: String,
    pub summary_heading: String,
    pub key_points: Vec<String>,
    pub action_items: Vec<ActionItem>,
    pub decisions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingValidationError {
    EmptyId,
    EmptyTitle,
    InvalidCreatedAt(String),
}

impl Display for MeetingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "meeting id cannot be empty"),
            Self::EmptyTitle => write!(f, "meeting title cannot be empty"),
            Self::InvalidCreatedAt(value) => {
                write!(
                    f,
                    "created_at `{value}` is not a UTC timestamp like `2024-11-24T12:00:00Z`"
                )
            }
        }
    }
}

impl Error for MeetingValidationError {}

impl Meeting {
    /// Creates a meeting with a fresh identifier and the current UTC time.
    pub fn new(
        title: impl Into<String>,
        transcript: impl Into<String>,
        summary: MeetingSummary,
    ) -> Self {
        Self::from_summary(
            Uuid::new_v4().to_string(),
            now_timestamp(),
            title,
            transcript,
            summary,
        )
    }

    /// Creates an empty meeting with a caller-provided id and timestamp.
    ///
    /// Used by import paths and tests where identity already exists.
    pub fn with_id(
        id: impl Into<MeetingId>,
        created_at: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self::from_summary(id, created_at, title, "", MeetingSummary::default())
    }

    pub fn from_summary(
        id: impl Into<MeetingId>,
        created_at: impl Into<String>,
        title: impl Into<String>,
        transcript: impl Into<String>,
        summary: MeetingSummary,
    ) -> Self {
        Self {
            id: id.into(),
            created_at: created_at.into(),
            title: title.into(),
            transcript: transcript.into(),
            summary_heading: summary.summary_heading,
            key_points: summary.key_points,
            action_items: summary.action_items,
            decisions: summary.decisions,
        }
    }

    pub fn validate(&self) -> Result<(), MeetingValidationError> {
        if self.id.trim().is_empty() {
            return Err(MeetingValidationError::EmptyId);
        }
        if self.title.trim().is_empty() {
            return Err(MeetingValidationError::EmptyTitle);
        }
        validate_timestamp(&self.created_at)
    }

    /// Plain-text summary export: heading, then one bulleted section per list.
    pub fn render_summary_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n{}\n", self.title, self.summary_heading));

        out.push_str("\nKey points:\n");
        push_bullets(&mut out, self.key_points.iter().cloned(), "_No key points._");

        out.push_str("\nAction items:\n");
        push_bullets(
            &mut out,
            self.action_items.iter().map(|item| match &item.deadline {
                Some(deadline) => format!("{}: {} (due {deadline})", item.assignee, item.task),
                None => format!("{}: {}", item.assignee, item.task),
            }),
            "_No action items._",
        );

        out.push_str("\nDecisions:\n");
        push_bullets(&mut out, self.decisions.iter().cloned(), "_No decisions._");
        out
    }

    /// Plain-text transcript export, always newline-terminated.
    pub fn render_transcript_text(&self) -> String {
        let mut out = self.transcript.clone();
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    /// Download name for an export, e.g. `m1_transcript.txt`.
    pub fn export_file_name(&self, kind: &str) -> String {
        format!("{}_{kind}.txt", self.id)
    }
}

/// Current UTC time with second precision and a `Z` suffix.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Converts any RFC 3339 timestamp to the stored form, e.g.
/// `2024-11-24T10:00:00+05:00` to `2024-11-24T05:00:00Z`.
///
/// Sub-second digits are truncated.
pub fn canonical_timestamp(value: &str) -> Result<String, MeetingValidationError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|parsed| {
            parsed
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .map_err(|_| MeetingValidationError::InvalidCreatedAt(value.to_string()))
}

/// Accepts only the stored form produced by `canonical_timestamp`.
pub(crate) fn validate_timestamp(value: &str) -> Result<(), MeetingValidationError> {
    if canonical_timestamp(value)? == value {
        Ok(())
    } else {
        Err(MeetingValidationError::InvalidCreatedAt(value.to_string()))
    }
}

fn push_bullets(out: &mut String, items: impl Iterator<Item = String>, empty: &str) {
    let mut wrote_any = false;
    for item in items {
        out.push_str("- ");
        out.push_str(&item);
        out.push('\n');
        wrote_any = true;
    }
    if !wrote_any {
        out.push_str(empty);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::{
        canonical_timestamp, now_timestamp, ActionItem, Meeting, MeetingSummary,
        MeetingValidationError,
    };

    #[test]
    fn new_meeting_has_fresh_id_and_valid_timestamp() {
        let first = Meeting::new("Sync", "", MeetingSummary::default());
        let second = Meeting::new("Sync", "", MeetingSummary::default());
        assert_ne!(first.id, second.id);
        first.validate().unwrap();
        assert!(first.created_at.ends_with('Z'));
    }

    #[test]
    fn timestamp_has_second_precision() {
        let stamp = now_timestamp();
        assert_eq!(stamp.len(), "2024-11-24T12:00:00Z".len());
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let mut meeting = Meeting::with_id("m1", "2024-11-24T12:00:00Z", "Planning");
        meeting.validate().unwrap();

        meeting.created_at = "yesterday".to_string();
        assert!(matches!(
            meeting.validate(),
            Err(MeetingValidationError::InvalidCreatedAt(_))
        ));

        meeting.created_at = "2024-11-24T12:00:00Z".to_string();
        meeting.title = "  ".to_string();
        assert_eq!(meeting.validate(), Err(MeetingValidationError::EmptyTitle));

        meeting.id = String::new();
        assert_eq!(meeting.validate(), Err(MeetingValidationError::EmptyId));
    }

    #[test]
    fn validate_accepts_only_utc_second_precision() {
        let mut meeting = Meeting::with_id("m1", "2024-11-24T12:00:00Z", "Planning");
        for stamp in [
            "2024-11-24T12:00:00+02:00",
            "2024-11-24T12:00:00.500Z",
            "2024-11-24T12:00:00+00:00",
            "2024-11-24t12:00:00z",
        ] {
            meeting.created_at = stamp.to_string();
            assert!(
                matches!(
                    meeting.validate(),
                    Err(MeetingValidationError::InvalidCreatedAt(_))
                ),
                "{stamp}"
            );
        }
    }

    #[test]
    fn canonical_timestamp_converts_offsets_to_utc() {
        assert_eq!(
            canonical_timestamp("2024-11-24T10:00:00+05:00").unwrap(),
            "2024-11-24T05:00:00Z"
        );
        assert_eq!(
            canonical_timestamp("2024-11-24T10:00:00.500Z").unwrap(),
            "2024-11-24T10:00:00Z"
        );
        assert_eq!(
            canonical_timestamp("2024-11-24T12:00:00Z").unwrap(),
            "2024-11-24T12:00:00Z"
        );
        assert!(matches!(
            canonical_timestamp("yesterday"),
            Err(MeetingValidationError::InvalidCreatedAt(_))
        ));
    }

    #[test]
    fn summary_json_defaults_missing_fields() {
        let summary = MeetingSummary::from_json(
            r#"{
                "summary_heading": "Sprint Planning",
                "key_points": ["Goals"],
                "action_items": [{"task": "Write docs"}, {"assignee": "Mike", "task": "OAuth", "deadline": "Wednesday"}]
            }"#,
        )
        .unwrap();

        assert!(summary.decisions.is_empty());
        assert_eq!(summary.action_items[0], ActionItem::unassigned("Write docs"));
        assert_eq!(
            summary.action_items[1],
            ActionItem::new("Mike", "OAuth", Some("Wednesday".to_string()))
        );
    }

    #[test]
    fn summary_text_lists_every_section() {
        let mut meeting = Meeting::with_id("m1", "2024-11-24T12:00:00Z", "Planning");
        meeting.summary_heading = "Week 5".to_string();
        meeting.key_points = vec!["A".to_string()];
        meeting.action_items = vec![
            ActionItem::new("Sam", "X", None),
            ActionItem::new("Ana", "Y", Some("Friday".to_string())),
        ];

        let text = meeting.render_summary_text();
        assert!(text.starts_with("Planning\nWeek 5\n"));
        assert!(text.contains("- A\n"));
        assert!(text.contains("- Sam: X\n"));
        assert!(text.contains("- Ana: Y (due Friday)\n"));
        assert!(text.contains("_No decisions._"));
    }

    #[test]
    fn transcript_export_is_newline_terminated() {
        let mut meeting = Meeting::with_id("m1", "2024-11-24T12:00:00Z", "Planning");
        assert_eq!(meeting.render_transcript_text(), "\n");

        meeting.transcript = "Ann: hello".to_string();
        assert_eq!(meeting.render_transcript_text(), "Ann: hello\n");
        assert_eq!(meeting.export_file_name("transcript"), "m1_transcript.txt");
    }
}
