//! Core types, constraints, and error handling for the Tributary pipeline.
//!
//! This crate provides the shared foundation used by all other Tributary
//! crates:
//! - [`TributaryError`] — unified error type using `thiserror`
//! - [`Constraints`] — the validated, read-only filter set every stage honors
//! - [`TributaryConfig`] — configuration loaded from `.tributary.toml`
//! - Shared types: [`Repository`], [`Commit`], [`NodeId`], [`Quantum`],
//!   [`CentralityKind`], [`RankedAuthor`], [`OutputFormat`]

mod config;
mod constraints;
mod error;
mod types;

pub use config::{MiningConfig, ProjectionConfig, TributaryConfig};
pub use constraints::{Constraints, DateWindow};
pub use error::TributaryError;
pub use types::{
    BackendKind, Category, CentralityKind, Commit, FileTouch, NodeId, OutputFormat, Quantum,
    RankedAuthor, Repository,
};

/// A convenience `Result` type for Tributary operations.
pub type Result<T> = std::result::Result<T, TributaryError>;
