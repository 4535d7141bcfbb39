//! The commit-source capability.
//!
//! A [`CommitSource`] turns one repository into a single-pass stream of
//! [`Commit`] records bounded by a [`DateWindow`]. One implementation
//! exists per backend kind; callers select one through [`source_for`]
//! and depend only on the traits here.

use tributary_core::{BackendKind, Commit, DateWindow, Repository, Result, TributaryError};

use crate::git::GitSource;
use crate::sync::Store;

/// A single-pass, date-bounded sequence of commits.
///
/// Commits are yielded in ascending time order, from the commit nearest
/// the window start to the commit nearest the window end. A stream that
/// has returned `Ok(None)` is exhausted; restart by calling
/// [`CommitSource::open`] again.
pub trait CommitStream {
    /// The next commit in the window, or `None` at end of history.
    ///
    /// A window selecting zero commits yields `None` on the first call;
    /// that is a valid, empty stream, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`TributaryError::Git`] if the underlying history walk
    /// fails mid-stream.
    fn next_commit(&mut self) -> Result<Option<Commit>>;
}

/// Capability for reading one repository's history.
pub trait CommitSource {
    /// Open a fresh stream over `repo`'s history restricted to `window`.
    ///
    /// Commits outside the window are skipped at the walk level, never
    /// yielded and filtered downstream, so a narrow window over a long
    /// history stays cheap.
    ///
    /// # Errors
    ///
    /// Returns [`TributaryError::SyncRequired`] when no local clone
    /// exists, or [`TributaryError::Git`] when the clone is unreadable.
    fn open(&self, repo: &Repository, window: &DateWindow) -> Result<Box<dyn CommitStream>>;
}

/// Options shared by commit-source implementations.
///
/// # Examples
///
/// ```
/// use tributary_vcs::source::SourceOptions;
///
/// let opts = SourceOptions::default();
/// assert_eq!(opts.max_files_per_commit, 64);
/// ```
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Skip commits touching more files than this. Mass imports and
    /// tree-wide renames say nothing about who collaborates with whom.
    pub max_files_per_commit: usize,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            max_files_per_commit: 64,
        }
    }
}

/// Select the commit source for a backend kind.
///
/// # Errors
///
/// Returns [`TributaryError::UnsupportedBackend`] for kinds without a
/// reader; the caller is expected to skip that repository and continue.
///
/// # Examples
///
/// ```
/// use tributary_core::BackendKind;
/// use tributary_vcs::source::{source_for, SourceOptions};
/// use tributary_vcs::sync::Store;
///
/// let store = Store::new("/tmp/tributary-stor".into());
/// assert!(source_for(BackendKind::Git, &store, SourceOptions::default()).is_ok());
/// assert!(source_for(BackendKind::Subversion, &store, SourceOptions::default()).is_err());
/// ```
pub fn source_for(
    kind: BackendKind,
    store: &Store,
    options: SourceOptions,
) -> Result<Box<dyn CommitSource>> {
    match kind {
        BackendKind::Git => Ok(Box::new(GitSource::new(store.clone(), options))),
        other => Err(TributaryError::UnsupportedBackend(other)),
    }
}
