//! Meeting domain model.
//!
//! # Responsibility
//! - Define the meeting aggregate and the summary shape it is built from.
//! - Provide path-addressed edits on loaded aggregates.
//!
//! # Invariants
//! - Every aggregate is identified by a stable, caller-assigned `MeetingId`.
//! - Child collections are owned by exactly one meeting and keep list order.

pub mod field_path;
pub mod meeting;
