//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define aggregate-oriented data access contracts.
//! - Isolate table layout and query building from service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Meeting::validate()` before persistence.
//! - "Not found" is a normal return value (`None` / `false`) for reads and
//!   deletes, and `NotFound` only for updates of a missing aggregate.

pub mod meeting_repo;
