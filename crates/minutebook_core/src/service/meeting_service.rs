//! Meeting use-case service.
//!
//! # Responsibility
//! - Provide the storage surface used by presentation callers:
//!   save, get, list, count, delete.
//! - Build new aggregates from a transcript plus summarizer output.
//! - Apply path-addressed edits and persist only the affected part.
//!
//! # Invariants
//! - Addressing errors are raised before any repository call.
//! - The caller's aggregate only changes after persistence succeeded.

use crate::model::field_path::{AddressingError, FieldPath, FieldValue};
use crate::model::meeting::{Meeting, MeetingId, MeetingSummary};
use crate::repo::meeting_repo::{MeetingListQuery, MeetingRepository, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, MeetingServiceError>;

/// Service error for meeting use-cases.
#[derive(Debug)]
pub enum MeetingServiceError {
    /// Field path does not fit the aggregate; nothing was written.
    Addressing(AddressingError),
    /// Target meeting does not exist.
    MeetingNotFound(MeetingId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for MeetingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Addressing(err) => write!(f, "{err}"),
            Self::MeetingNotFound(id) => write!(f, "meeting not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MeetingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Addressing(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::MeetingNotFound(_) => None,
        }
    }
}

impl From<AddressingError> for MeetingServiceError {
    fn from(value: AddressingError) -> Self {
        Self::Addressing(value)
    }
}

impl From<RepoError> for MeetingServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::MeetingNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Meeting service facade over repository implementations.
pub struct MeetingService<R: MeetingRepository> {
    repo: R,
}

impl<R: MeetingRepository> MeetingService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Read access to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Stores a new meeting built from a transcript and its summary.
    ///
    /// # Contract
    /// - Mints a fresh id and a UTC `created_at`.
    /// - Returns the new meeting id.
    pub fn record_meeting(
        &mut self,
        title: impl Into<String>,
        transcript: impl Into<String>,
        summary: MeetingSummary,
    ) -> ServiceResult<MeetingId> {
        let meeting = Meeting::new(title, transcript, summary);
        Ok(self.repo.save_meeting(&meeting)?)
    }

    pub fn save(&mut self, meeting: &Meeting) -> ServiceResult<MeetingId> {
        Ok(self.repo.save_meeting(meeting)?)
    }

    pub fn get(&self, id: &str) -> ServiceResult<Option<Meeting>> {
        Ok(self.repo.get_meeting(id)?)
    }

    /// Lists meetings newest first. `limit = None` returns every meeting
    /// after `offset`.
    pub fn list_all(&self, limit: Option<u32>, offset: u32) -> ServiceResult<Vec<Meeting>> {
        let query = MeetingListQuery {
            limit,
            offset,
            ..MeetingListQuery::default()
        };
        Ok(self.repo.list_meetings(&query)?)
    }

    pub fn count(&self) -> ServiceResult<u64> {
        Ok(self.repo.count_meetings()?)
    }

    /// Deletes a meeting and its children. Returns `false` when absent.
    pub fn delete(&mut self, id: &str) -> ServiceResult<bool> {
        Ok(self.repo.delete_meeting(id)?)
    }

    /// Replaces the value at `path` and persists the affected rows.
    ///
    /// # Contract
    /// - Invalid paths fail with `Addressing` and issue no writes.
    /// - `meeting` is updated in place only after the write committed.
    pub fn update_field(
        &mut self,
        meeting: &mut Meeting,
        path: &FieldPath,
        value: FieldValue,
    ) -> ServiceResult<()> {
        let mut edited = meeting.clone();
        let part = path.apply(&mut edited, value)?;
        self.repo.persist_part(&edited, part)?;
        *meeting = edited;
        Ok(())
    }
}
