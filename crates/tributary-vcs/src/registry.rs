//! Registry list-file loading.
//!
//! Repositories of interest live in plain-text list files under
//! `<data_dir>/lists/`, one file per category (`kernel`, `compiler`,
//! `dist_stor`, ...), one clone URL per line. The loader produces an
//! ordered, deduplicated set of [`Repository`] records; duplicate keys
//! or URLs are a load-time error, so nothing downstream has to handle
//! them.

use std::collections::HashSet;
use std::path::Path;

use tributary_core::{Category, Repository, Result, TributaryError};

/// An ordered, deduplicated collection of registered repositories.
///
/// # Examples
///
/// ```
/// use tributary_core::{Category, Repository};
/// use tributary_vcs::registry::Registry;
///
/// let repos = vec![
///     Repository::from_url("https://github.com/illumos/gate", Category::Kernel).unwrap(),
/// ];
/// let registry = Registry::from_repositories(repos).unwrap();
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    repos: Vec<Repository>,
}

impl Registry {
    /// Load every category list file under `<data_dir>/lists/`.
    ///
    /// Missing list files are fine (a registry does not have to cover
    /// every category); a missing `lists/` directory yields an empty
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns [`TributaryError::Registry`] for malformed URLs or
    /// duplicate entries, [`TributaryError::Io`] for unreadable files.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let lists = data_dir.join("lists");
        let mut repos = Vec::new();
        for category in Category::ALL {
            let path = lists.join(category.list_file());
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            for (lineno, line) in content.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let repo = Repository::from_url(line, category).map_err(|e| {
                    TributaryError::Registry(format!(
                        "{}:{}: {e}",
                        path.display(),
                        lineno + 1
                    ))
                })?;
                repos.push(repo);
            }
        }
        Self::from_repositories(repos)
    }

    /// Build a registry from already-parsed records, enforcing key and
    /// URL uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`TributaryError::Registry`] on a duplicate `owner/name`
    /// key or a duplicate URL.
    pub fn from_repositories(repos: Vec<Repository>) -> Result<Self> {
        let mut keys = HashSet::new();
        let mut urls = HashSet::new();
        for repo in &repos {
            if !keys.insert(repo.key()) {
                return Err(TributaryError::Registry(format!(
                    "duplicate repository key: {}",
                    repo.key()
                )));
            }
            if !urls.insert(repo.url.clone()) {
                return Err(TributaryError::Registry(format!(
                    "duplicate repository URL: {}",
                    repo.url
                )));
            }
        }
        Ok(Self { repos })
    }

    /// Iterate registered repositories in list order.
    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.repos.iter()
    }

    /// Number of registered repositories.
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}
