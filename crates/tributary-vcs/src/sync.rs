//! Local clone storage and synchronization.
//!
//! Clones live under `<data_dir>/stor/<patron>/<category>/<name>`, one
//! directory per hosting domain so two repositories with the same name
//! cannot collide. Synchronization clones missing repositories and
//! fetches existing ones; it is the only place in the workspace that
//! touches the network, and it runs before any graph is built.

use std::path::PathBuf;

use serde::Serialize;
use tributary_core::{Repository, Result, TributaryError};

use crate::registry::Registry;

/// On-disk layout of the clone store.
///
/// # Examples
///
/// ```
/// use tributary_core::{Category, Repository};
/// use tributary_vcs::sync::Store;
///
/// let store = Store::new("/home/nick/.tributary/stor".into());
/// let repo = Repository::from_url("https://github.com/illumos/gate", Category::Kernel).unwrap();
/// assert_eq!(
///     store.clone_path(&repo),
///     std::path::PathBuf::from("/home/nick/.tributary/stor/github.com/kernel/gate"),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

/// What synchronization did for one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// Fresh clone from the remote.
    Cloned,
    /// Existing clone fetched.
    Fetched,
}

/// Per-repository synchronization result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Repository `owner/name` key.
    pub repo: String,
    /// Clone or fetch.
    pub action: SyncAction,
}

impl Store {
    /// A store rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Where `repo`'s local clone lives (whether or not it exists yet).
    pub fn clone_path(&self, repo: &Repository) -> PathBuf {
        self.root
            .join(repo.patron())
            .join(repo.category.list_file())
            .join(&repo.name)
    }

    /// Bring one repository's clone up to date: clone it if absent,
    /// fetch from `origin` if present.
    ///
    /// # Errors
    ///
    /// Returns [`TributaryError::SyncFailed`] naming the repository on
    /// any clone or fetch failure.
    pub fn sync(&self, repo: &Repository) -> Result<SyncOutcome> {
        let path = self.clone_path(repo);
        let fail = |e: git2::Error| {
            TributaryError::SyncFailed(format!("{}: {e}", repo.key()))
        };

        if path.exists() {
            let git = git2::Repository::open(&path).map_err(fail)?;
            let mut remote = git.find_remote("origin").map_err(fail)?;
            remote.fetch(&[] as &[&str], None, None).map_err(fail)?;
            Ok(SyncOutcome {
                repo: repo.key(),
                action: SyncAction::Fetched,
            })
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            git2::Repository::clone(&repo.url, &path).map_err(fail)?;
            Ok(SyncOutcome {
                repo: repo.key(),
                action: SyncAction::Cloned,
            })
        }
    }

    /// Synchronize every registered repository, in list order.
    ///
    /// Unlike graph building, synchronization stops at the first
    /// failure: a half-synced store is exactly the state the build
    /// refuses to run on.
    ///
    /// # Errors
    ///
    /// Returns the first [`TributaryError::SyncFailed`] encountered.
    pub fn sync_all(&self, registry: &Registry) -> Result<Vec<SyncOutcome>> {
        let mut outcomes = Vec::with_capacity(registry.len());
        for repo in registry.iter() {
            outcomes.push(self.sync(repo)?);
        }
        Ok(outcomes)
    }

    /// Remove on-disk clones that no registered repository claims.
    ///
    /// Repositories get dropped from list files over time; their stale
    /// clones would otherwise sit in the store forever. Returns the
    /// removed clone paths.
    ///
    /// # Errors
    ///
    /// Returns [`TributaryError::Io`] if the store cannot be walked or
    /// a stale clone cannot be removed.
    pub fn purge_unrecognized(&self, registry: &Registry) -> Result<Vec<PathBuf>> {
        let recognized: std::collections::HashSet<PathBuf> =
            registry.iter().map(|r| self.clone_path(r)).collect();
        let mut removed = Vec::new();
        if !self.root.exists() {
            return Ok(removed);
        }
        // stor/<patron>/<category>/<name>
        for patron in std::fs::read_dir(&self.root)? {
            let patron = patron?.path();
            if !patron.is_dir() {
                continue;
            }
            for category in std::fs::read_dir(&patron)? {
                let category = category?.path();
                if !category.is_dir() {
                    continue;
                }
                for clone in std::fs::read_dir(&category)? {
                    let clone = clone?.path();
                    if clone.is_dir() && !recognized.contains(&clone) {
                        std::fs::remove_dir_all(&clone)?;
                        removed.push(clone);
                    }
                }
            }
        }
        Ok(removed)
    }
}
