use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Category, CentralityKind, Quantum, Repository};

/// Inclusive time window in epoch seconds, derived from a constraint set.
///
/// The end always has a concrete value: "no end constraint" means "now"
/// at the moment the window is taken, so two repositories mined in the
/// same run see the same cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// Earliest commit time to admit, if any.
    pub start: Option<i64>,
    /// Latest commit time to admit.
    pub end: i64,
}

impl DateWindow {
    /// Whether `timestamp` falls inside the window.
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp <= self.end && self.start.is_none_or(|s| timestamp >= s)
    }
}

/// The validated, read-only constraint set consumed by every pipeline
/// stage. An absent field means "unconstrained" in that dimension.
///
/// The CLI layer is responsible for parsing raw flags into this
/// structure and rejecting malformed values; nothing in the core
/// re-validates it.
///
/// # Examples
///
/// ```
/// use tributary_core::Constraints;
///
/// let c = Constraints::default();
/// assert!(c.author.is_none());
/// assert!(c.file_matches("any/path.c"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    /// Restrict centrality to this author's neighborhood (email key).
    pub author: Option<String>,
    /// Unit of contribution volume.
    #[serde(default)]
    pub quantum: Quantum,
    /// Restrict mining to one repository, by `owner/name` key.
    pub repo: Option<String>,
    /// Restrict mining to one registry category.
    pub category: Option<Category>,
    /// Subtree prefixes; a file must live under one of them to count.
    /// Empty means every file counts.
    #[serde(default)]
    pub subtrees: Vec<String>,
    /// Earliest commit time to admit.
    pub since: Option<DateTime<Utc>>,
    /// Latest commit time to admit. Defaults to "now".
    pub until: Option<DateTime<Utc>>,
    /// Truncate ranked results to this many rows.
    pub num: Option<usize>,
    /// Ego-network hop limit around `author`.
    pub distance: Option<usize>,
    /// Which centrality measure to compute.
    #[serde(default)]
    pub kind: CentralityKind,
}

impl Constraints {
    /// The concrete time window for this run.
    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.since.map(|t| t.timestamp()),
            end: self
                .until
                .map_or_else(|| Utc::now().timestamp(), |t| t.timestamp()),
        }
    }

    /// Whether `repo` passes the repository and category scope.
    pub fn repo_matches(&self, repo: &Repository) -> bool {
        if let Some(key) = &self.repo {
            if repo.key() != *key {
                return false;
            }
        }
        if let Some(category) = self.category {
            if repo.category != category {
                return false;
            }
        }
        true
    }

    /// Whether `path` falls under an active subtree restriction.
    ///
    /// Matches on whole path components, so a `kernel/` restriction
    /// admits `kernel/io.c` but not `kernel2/io.c`.
    pub fn file_matches(&self, path: &str) -> bool {
        if self.subtrees.is_empty() {
            return true;
        }
        self.subtrees.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            path.strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_subtrees_admit_everything() {
        let c = Constraints::default();
        assert!(c.file_matches("doc/readme.md"));
    }

    #[test]
    fn subtree_restriction_matches_whole_components() {
        let c = Constraints {
            subtrees: vec!["kernel/".into()],
            ..Constraints::default()
        };
        assert!(c.file_matches("kernel/io.c"));
        assert!(c.file_matches("kernel"));
        assert!(!c.file_matches("kernel2/io.c"));
        assert!(!c.file_matches("doc/readme.md"));
    }

    #[test]
    fn window_end_defaults_to_now() {
        let c = Constraints::default();
        let before = Utc::now().timestamp();
        let window = c.window();
        assert!(window.start.is_none());
        assert!(window.end >= before);
    }

    #[test]
    fn window_contains_respects_both_bounds() {
        let c = Constraints {
            since: Some(Utc.timestamp_opt(100, 0).unwrap()),
            until: Some(Utc.timestamp_opt(200, 0).unwrap()),
            ..Constraints::default()
        };
        let window = c.window();
        assert!(!window.contains(99));
        assert!(window.contains(100));
        assert!(window.contains(200));
        assert!(!window.contains(201));
    }

    #[test]
    fn repo_scope_filters_by_key_and_category() {
        let repo = Repository::from_url("https://github.com/illumos/gate", Category::Kernel)
            .unwrap();
        let by_key = Constraints {
            repo: Some("illumos/gate".into()),
            ..Constraints::default()
        };
        assert!(by_key.repo_matches(&repo));

        let wrong_key = Constraints {
            repo: Some("other/repo".into()),
            ..Constraints::default()
        };
        assert!(!wrong_key.repo_matches(&repo));

        let wrong_category = Constraints {
            category: Some(Category::Documentation),
            ..Constraints::default()
        };
        assert!(!wrong_category.repo_matches(&repo));
    }
}
