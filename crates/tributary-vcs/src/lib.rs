//! Version-control access for the Tributary pipeline.
//!
//! Exposes repository history as a lazily-produced, date-bounded commit
//! stream behind the [`CommitSource`](source::CommitSource) capability,
//! with a git2-backed implementation, registry list-file loading, and
//! local-store synchronization. Nothing outside this crate touches a
//! version-control backend directly.

pub mod git;
pub mod registry;
pub mod source;
pub mod sync;
