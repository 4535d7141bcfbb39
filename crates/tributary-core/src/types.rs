use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version-control backend of a repository.
///
/// Only git has a commit-reading implementation today; the other kinds
/// exist so registry lists can carry repositories we know about but
/// cannot mine yet.
///
/// # Examples
///
/// ```
/// use tributary_core::BackendKind;
///
/// let kind: BackendKind = "git".parse().unwrap();
/// assert_eq!(kind, BackendKind::Git);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Git, read through libgit2.
    #[default]
    Git,
    /// Mercurial. No reader yet.
    Mercurial,
    /// Subversion. No reader yet.
    Subversion,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Git => write!(f, "git"),
            BackendKind::Mercurial => write!(f, "hg"),
            BackendKind::Subversion => write!(f, "svn"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "git" => Ok(BackendKind::Git),
            "hg" | "mercurial" => Ok(BackendKind::Mercurial),
            "svn" | "subversion" => Ok(BackendKind::Subversion),
            other => Err(format!("unknown backend kind: {other}")),
        }
    }
}

/// Classification of a registry repository.
///
/// The taxonomy is coarse on purpose; `Userland` is the kitchen sink for
/// anything not important enough to categorize further.
///
/// # Examples
///
/// ```
/// use tributary_core::Category;
///
/// let cat: Category = "kernel".parse().unwrap();
/// assert_eq!(cat.list_file(), "kernel");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Operating system kernels.
    Kernel,
    /// Compilers and toolchains.
    Compiler,
    /// Distributed storage systems.
    DistributedStorage,
    /// Build systems.
    BuildSystem,
    /// Documentation repositories.
    Documentation,
    /// Orchestration tooling.
    Orchestration,
    /// Everything else in userland.
    Userland,
    /// Hypervisors and virtualization.
    Virtualization,
}

impl Category {
    /// All categories, in registry list-file order.
    pub const ALL: [Category; 8] = [
        Category::BuildSystem,
        Category::Compiler,
        Category::DistributedStorage,
        Category::Documentation,
        Category::Kernel,
        Category::Orchestration,
        Category::Userland,
        Category::Virtualization,
    ];

    /// Name of the registry list file holding this category's URLs.
    pub fn list_file(self) -> &'static str {
        match self {
            Category::Kernel => "kernel",
            Category::Compiler => "compiler",
            Category::DistributedStorage => "dist_stor",
            Category::BuildSystem => "build_system",
            Category::Documentation => "doc",
            Category::Orchestration => "orches",
            Category::Userland => "userland",
            Category::Virtualization => "virt",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.list_file())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kernel" => Ok(Category::Kernel),
            "compiler" => Ok(Category::Compiler),
            "dist_stor" | "distributed_storage" => Ok(Category::DistributedStorage),
            "build_system" => Ok(Category::BuildSystem),
            "doc" | "documentation" => Ok(Category::Documentation),
            "orches" | "orchestration" => Ok(Category::Orchestration),
            "userland" => Ok(Category::Userland),
            "virt" | "virtualization" => Ok(Category::Virtualization),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// A registered repository. Immutable after registry load.
///
/// Uniquely keyed by `owner/name`; the registry rejects duplicate URLs
/// before any `Repository` reaches the mining pipeline.
///
/// # Examples
///
/// ```
/// use tributary_core::{Category, Repository};
///
/// let repo = Repository::from_url("https://github.com/illumos/gate.git", Category::Kernel)
///     .unwrap();
/// assert_eq!(repo.key(), "illumos/gate");
/// assert_eq!(repo.patron(), "github.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Owning organization or user.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Canonical clone URL.
    pub url: String,
    /// Version-control backend.
    pub backend: BackendKind,
    /// Registry classification.
    pub category: Category,
}

impl Repository {
    /// Parse a repository from its clone URL.
    ///
    /// Accepts `https://host/owner/name[.git]` and `git@host:owner/name[.git]`
    /// forms. The backend defaults to git.
    ///
    /// # Errors
    ///
    /// Returns an error string when owner and name cannot be extracted.
    pub fn from_url(url: &str, category: Category) -> Result<Self, String> {
        let trimmed = url.trim().trim_end_matches('/');
        let path = match trimmed.split_once("://") {
            Some((_, rest)) => rest,
            None => trimmed
                .split_once(':')
                .map(|(_, p)| p)
                .ok_or_else(|| format!("unparseable repository URL: {url}"))?,
        };
        let mut segments = path.rsplit('/');
        let name = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("repository URL has no name segment: {url}"))?
            .trim_end_matches(".git");
        let owner = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("repository URL has no owner segment: {url}"))?;
        if name.is_empty() {
            return Err(format!("repository URL has an empty name: {url}"));
        }
        Ok(Repository {
            owner: owner.to_string(),
            name: name.to_string(),
            url: trimmed.to_string(),
            backend: BackendKind::Git,
            category,
        })
    }

    /// Unique `owner/name` key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Hosting domain used as the on-disk storage partition, e.g.
    /// `github.com`. Falls back to `unknown` for URLs with no host.
    pub fn patron(&self) -> String {
        let rest = match self.url.split_once("://") {
            Some((_, rest)) => rest,
            None => match self.url.split_once('@') {
                Some((_, rest)) => rest,
                None => &self.url,
            },
        };
        rest.split(['/', ':'])
            .next()
            .filter(|h| !h.is_empty())
            .unwrap_or("unknown")
            .to_string()
    }
}

/// One file modification inside a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTouch {
    /// Path relative to the repository root.
    pub path: String,
    /// Lines added in this commit.
    pub lines_added: u64,
    /// Lines deleted in this commit.
    pub lines_deleted: u64,
}

impl FileTouch {
    /// Total churn of this touch, never less than 1 so a rename or
    /// mode change still counts as work.
    pub fn churn(&self) -> u64 {
        (self.lines_added + self.lines_deleted).max(1)
    }
}

/// A single commit record, produced transiently by a commit stream.
///
/// Commits are folded into graph edges and dropped; nothing in the
/// pipeline retains them, so memory stays bounded regardless of how
/// long a repository's history is.
#[derive(Debug, Clone)]
pub struct Commit {
    /// Full 40-hex content-addressed id.
    pub id: String,
    /// Author display name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Commit time, seconds since the Unix epoch.
    pub timestamp: i64,
    /// Files touched by this commit, in diff order.
    pub files: Vec<FileTouch>,
}

/// Identity of a graph node: a typed, stable string key.
///
/// Identity is always derived from record fields, never inferred from
/// graph structure, so the same author yields the same node across
/// repositories and runs.
///
/// # Examples
///
/// ```
/// use tributary_core::NodeId;
///
/// let a = NodeId::Author("alice@example.com".into());
/// assert_eq!(a.key(), "alice@example.com");
/// assert_eq!(a.to_string(), "author:alice@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    /// An author, keyed by display name.
    Author(String),
    /// A bare email identity.
    Email(String),
    /// A commit, keyed by hex id.
    Commit(String),
    /// A file, keyed by repository-relative path.
    File(String),
    /// A repository, keyed by `owner/name`.
    Repo(String),
}

impl NodeId {
    /// The raw string key, without the type tag.
    pub fn key(&self) -> &str {
        match self {
            NodeId::Author(k)
            | NodeId::Email(k)
            | NodeId::Commit(k)
            | NodeId::File(k)
            | NodeId::Repo(k) => k,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            NodeId::Author(_) => "author",
            NodeId::Email(_) => "email",
            NodeId::Commit(_) => "commit",
            NodeId::File(_) => "file",
            NodeId::Repo(_) => "repo",
        };
        write!(f, "{tag}:{}", self.key())
    }
}

/// Unit used to measure an author's contribution volume.
///
/// The quantum decides how much weight one file touch adds to the
/// `file → author` edge. A commit's diff touches each file at most
/// once, so `Commit` and `File` both contribute one unit per touch and
/// produce identical edge weights; only `Line` weighs touches
/// differently, by their churn.
///
/// # Examples
///
/// ```
/// use tributary_core::Quantum;
///
/// let q: Quantum = "line".parse().unwrap();
/// assert_eq!(q, Quantum::Line);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantum {
    /// One unit per commit touching the file.
    Commit,
    /// One unit per file touch.
    #[default]
    File,
    /// Lines added plus deleted, minimum 1.
    Line,
}

impl Quantum {
    /// Edge-weight contribution of one file touch under this quantum.
    pub fn weight_of(self, touch: &FileTouch) -> u64 {
        match self {
            Quantum::Commit | Quantum::File => 1,
            Quantum::Line => touch.churn(),
        }
    }
}

impl fmt::Display for Quantum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantum::Commit => write!(f, "commit"),
            Quantum::File => write!(f, "file"),
            Quantum::Line => write!(f, "line"),
        }
    }
}

impl FromStr for Quantum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "commit" => Ok(Quantum::Commit),
            "file" => Ok(Quantum::File),
            "line" => Ok(Quantum::Line),
            other => Err(format!("unknown quantum of work: {other}")),
        }
    }
}

/// Which centrality measure to compute.
///
/// # Examples
///
/// ```
/// use tributary_core::CentralityKind;
///
/// let k: CentralityKind = "betweenness".parse().unwrap();
/// assert_eq!(k, CentralityKind::Betweenness);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentralityKind {
    /// Sum of incident edge weights.
    #[default]
    Degree,
    /// Inverse mean distance to reachable authors.
    Closeness,
    /// Fraction of shortest paths passing through.
    Betweenness,
}

impl fmt::Display for CentralityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CentralityKind::Degree => write!(f, "degree"),
            CentralityKind::Closeness => write!(f, "closeness"),
            CentralityKind::Betweenness => write!(f, "betweenness"),
        }
    }
}

impl FromStr for CentralityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "degree" => Ok(CentralityKind::Degree),
            "closeness" => Ok(CentralityKind::Closeness),
            "betweenness" => Ok(CentralityKind::Betweenness),
            other => Err(format!("unknown centrality kind: {other}")),
        }
    }
}

/// One row of a centrality result: an author and their score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAuthor {
    /// Author key (display name).
    pub author: String,
    /// Centrality score under the requested measure.
    pub score: f64,
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use tributary_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
