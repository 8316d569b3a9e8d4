//! Core persistence for minutebook meeting records.
//! This crate is the single source of truth for aggregate storage invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use db::{close_db, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::field_path::{AddressingError, FieldPath, FieldValue, MeetingPart};
pub use model::meeting::{
    canonical_timestamp, ActionItem, Meeting, MeetingId, MeetingSummary, MeetingValidationError,
    DEFAULT_ASSIGNEE,
};
pub use query::{QueryError, QueryResult, SchemaError};
pub use repo::meeting_repo::{
    MeetingListQuery, MeetingRepository, RepoError, RepoResult, SqliteMeetingRepository,
};
pub use service::meeting_service::{MeetingService, MeetingServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
