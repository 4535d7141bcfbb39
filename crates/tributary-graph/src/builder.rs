//! Graph construction from commit streams.
//!
//! Drives a [`CommitSource`](tributary_vcs::source::CommitSource) for
//! every registered repository that passes the active constraints and
//! folds each commit into the six canonical graphs:
//!
//! - `email_author` — email identity → author
//! - `author_commit` — author → commit
//! - `file_commit` — file → commit
//! - `file_author` — file → author (the duality projection input)
//! - `repo_author` — repository → author, intensity counting that
//!   author's commits in the repository
//! - `repo_merge` — repository → repository, an edge per commit id
//!   that shows up in more than one repository (cross-pollination)
//!
//! Repositories are mined in parallel, each into a private partial
//! store; partials are merged one repository at a time by summing
//! intensities, so a partially-consumed build never holds a corrupt
//! shared store.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use tributary_core::{Commit, Constraints, DateWindow, NodeId, Repository, Result, TributaryError};
use tributary_vcs::registry::Registry;
use tributary_vcs::source::{source_for, SourceOptions};
use tributary_vcs::sync::Store;

use crate::store::GraphStore;

/// Email identity → author graph name.
pub const EMAIL_AUTHOR: &str = "email_author";
/// Author → commit graph name.
pub const AUTHOR_COMMIT: &str = "author_commit";
/// File → commit graph name.
pub const FILE_COMMIT: &str = "file_commit";
/// File → author graph name; input to the duality projection.
pub const FILE_AUTHOR: &str = "file_author";
/// Repository → author graph name.
pub const REPO_AUTHOR: &str = "repo_author";
/// Repository → repository cross-pollination graph name.
pub const REPO_MERGE: &str = "repo_merge";

const CANONICAL: [&str; 6] = [
    EMAIL_AUTHOR,
    AUTHOR_COMMIT,
    FILE_COMMIT,
    FILE_AUTHOR,
    REPO_AUTHOR,
    REPO_MERGE,
];

/// A repository the build skipped, with the reason why.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRepo {
    /// Repository `owner/name` key.
    pub repo: String,
    /// Human-readable skip reason.
    pub reason: String,
}

/// What the build did, beyond the graphs themselves.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    /// Repositories successfully mined.
    pub repos_mined: usize,
    /// Commits folded into edges across all repositories.
    pub commits_folded: u64,
    /// Repositories skipped with reasons, reported as a batch.
    pub skipped: Vec<SkippedRepo>,
}

/// The populated store plus its build report.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The canonical graphs.
    pub store: GraphStore,
    /// Skips and counters.
    pub report: BuildReport,
}

struct Mined {
    key: String,
    partial: GraphStore,
    commits: u64,
    commit_ids: Vec<String>,
}

/// Build the canonical graphs for every in-scope repository.
///
/// A repository whose backend has no reader is skipped and listed in
/// the report; the rest still contribute. A repository with no local
/// clone aborts the whole run: silently ranking whatever happened to be
/// on disk would bias centrality comparisons across repositories.
///
/// # Errors
///
/// Returns [`TributaryError::SyncRequired`] when a clone is missing and
/// [`TributaryError::Git`] when one is unreadable.
pub fn build_graphs(
    registry: &Registry,
    constraints: &Constraints,
    store: &Store,
    options: &SourceOptions,
) -> Result<BuildOutput> {
    let window = constraints.window();
    let candidates: Vec<&Repository> = registry
        .iter()
        .filter(|r| constraints.repo_matches(r))
        .collect();

    let results: Vec<(String, Result<Mined>)> = candidates
        .par_iter()
        .map(|repo| (repo.key(), mine_repo(repo, constraints, &window, store, options)))
        .collect();

    let mut merged = GraphStore::new();
    for name in CANONICAL {
        merged.create(name, true);
    }
    let mut report = BuildReport::default();
    // Commit id -> first repository that carried it, for merge edges.
    let mut first_seen: HashMap<String, String> = HashMap::new();

    for (key, result) in results {
        let mined = match result {
            Ok(mined) => mined,
            Err(err @ TributaryError::UnsupportedBackend(_)) => {
                report.skipped.push(SkippedRepo {
                    repo: key,
                    reason: err.to_string(),
                });
                continue;
            }
            Err(fatal) => return Err(fatal),
        };

        merged.merge(&mined.partial);
        for id in mined.commit_ids {
            match first_seen.get(&id) {
                Some(origin) if *origin != mined.key => {
                    merged.create(REPO_MERGE, true).connect(
                        NodeId::Repo(origin.clone()),
                        NodeId::Repo(mined.key.clone()),
                    );
                }
                Some(_) => {}
                None => {
                    first_seen.insert(id, mined.key.clone());
                }
            }
        }
        report.repos_mined += 1;
        report.commits_folded += mined.commits;
    }

    Ok(BuildOutput {
        store: merged,
        report,
    })
}

fn mine_repo(
    repo: &Repository,
    constraints: &Constraints,
    window: &DateWindow,
    store: &Store,
    options: &SourceOptions,
) -> Result<Mined> {
    let source = source_for(repo.backend, store, options.clone())?;
    let mut stream = source.open(repo, window)?;

    let mut partial = GraphStore::new();
    for name in CANONICAL {
        partial.create(name, true);
    }

    let repo_node = NodeId::Repo(repo.key());
    let mut commits = 0u64;
    let mut commit_ids = Vec::new();
    while let Some(commit) = stream.next_commit()? {
        fold_commit(&mut partial, &repo_node, &commit, constraints);
        commits += 1;
        commit_ids.push(commit.id);
    }

    Ok(Mined {
        key: repo.key(),
        partial,
        commits,
        commit_ids,
    })
}

/// Fold one commit into a partial store's graphs, honoring the subtree
/// restriction. A file outside the restriction is skipped before its
/// path is ever interned as a node, keeping memory bounded by the
/// restricted scope.
fn fold_commit(
    store: &mut GraphStore,
    repo_node: &NodeId,
    commit: &Commit,
    constraints: &Constraints,
) {
    let ts = Some(commit.timestamp);
    let author = NodeId::Author(commit.author.clone());
    let commit_node = NodeId::Commit(commit.id.clone());

    store.create(EMAIL_AUTHOR, true).connect_weighted(
        NodeId::Email(commit.email.clone()),
        author.clone(),
        1,
        ts,
    );
    store
        .create(AUTHOR_COMMIT, true)
        .connect_weighted(author.clone(), commit_node.clone(), 1, ts);
    store
        .create(REPO_AUTHOR, true)
        .connect_weighted(repo_node.clone(), author.clone(), 1, ts);

    for touch in &commit.files {
        if !constraints.file_matches(&touch.path) {
            continue;
        }
        let file = NodeId::File(touch.path.clone());
        store
            .create(FILE_COMMIT, true)
            .connect_weighted(file.clone(), commit_node.clone(), 1, ts);
        store.create(FILE_AUTHOR, true).connect_weighted(
            file,
            author.clone(),
            constraints.quantum.weight_of(touch),
            ts,
        );
    }
}

/// Resolve an author constraint given as a name or an email address to
/// the author node key used by the projection.
pub fn resolve_author(store: &GraphStore, query: &str) -> Option<String> {
    let graph = store.get(EMAIL_AUTHOR)?;
    let email = NodeId::Email(query.to_string());
    if let Some((author, _)) = graph.neighbors(&email).next() {
        return Some(author.key().to_string());
    }
    let author = NodeId::Author(query.to_string());
    if graph.nodes().any(|n| *n == author) {
        return Some(query.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use tributary_core::{BackendKind, Category, Quantum};

    use crate::project::{project, Decay};

    fn commit_file(
        repo: &git2::Repository,
        name: &str,
        contents: &str,
        author: &str,
        email: &str,
        timestamp: i64,
    ) {
        let workdir = repo.workdir().unwrap();
        if let Some(parent) = Path::new(name).parent() {
            std::fs::create_dir_all(workdir.join(parent)).unwrap();
        }
        std::fs::write(workdir.join(name), contents).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let sig = git2::Signature::new(author, email, &git2::Time::new(timestamp, 0)).unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .map(|oid| vec![repo.find_commit(oid).unwrap()])
            .unwrap_or_default();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "test", &tree, &parent_refs)
            .unwrap();
    }

    fn fixture_repo(store: &Store, url: &str) -> (Repository, git2::Repository) {
        let repo = Repository::from_url(url, Category::Userland).unwrap();
        let path = store.clone_path(&repo);
        std::fs::create_dir_all(&path).unwrap();
        let git = git2::Repository::init(&path).unwrap();
        (repo, git)
    }

    fn build(
        registry: &Registry,
        constraints: &Constraints,
        store: &Store,
    ) -> Result<BuildOutput> {
        build_graphs(registry, constraints, store, &SourceOptions::default())
    }

    #[test]
    fn two_authors_on_one_file_project_to_one_pair() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let (repo, git) = fixture_repo(&store, "https://github.com/test/one");
        commit_file(&git, "a.c", "int x;\n", "alice", "alice@x.com", 1000);
        commit_file(&git, "a.c", "int x;\nint y;\n", "bob", "bob@x.com", 2000);

        let registry = Registry::from_repositories(vec![repo]).unwrap();
        let output = build(&registry, &Constraints::default(), &store).unwrap();
        assert_eq!(output.report.repos_mined, 1);
        assert_eq!(output.report.commits_folded, 2);

        let file_author = output.store.get(FILE_AUTHOR).unwrap();
        assert_eq!(file_author.edge_count(), 2);

        let projected = project(&output.store, FILE_AUTHOR, &Decay::Constant, 256).unwrap();
        assert_eq!(projected.edge_count(), 1);
        assert_eq!(projected.weight("alice", "bob"), Some(1.0));
    }

    #[test]
    fn excluding_date_range_builds_empty_graphs_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let (repo, git) = fixture_repo(&store, "https://github.com/test/one");
        commit_file(&git, "a.c", "1\n", "alice", "alice@x.com", 1000);

        let constraints = Constraints {
            since: Some(chrono::DateTime::from_timestamp(5000, 0).unwrap()),
            until: Some(chrono::DateTime::from_timestamp(6000, 0).unwrap()),
            ..Constraints::default()
        };
        let registry = Registry::from_repositories(vec![repo]).unwrap();
        let output = build(&registry, &constraints, &store).unwrap();
        assert_eq!(output.report.commits_folded, 0);
        assert_eq!(output.store.get(FILE_AUTHOR).unwrap().edge_count(), 0);
        assert!(output.report.skipped.is_empty());
    }

    #[test]
    fn subtree_restriction_skips_outside_files_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let (repo, git) = fixture_repo(&store, "https://github.com/test/one");
        commit_file(&git, "kernel/io.c", "io\n", "alice", "alice@x.com", 1000);
        commit_file(&git, "doc/readme.md", "docs\n", "alice", "alice@x.com", 2000);

        let constraints = Constraints {
            subtrees: vec!["kernel/".into()],
            ..Constraints::default()
        };
        let registry = Registry::from_repositories(vec![repo]).unwrap();
        let output = build(&registry, &constraints, &store).unwrap();

        let file_author = output.store.get(FILE_AUTHOR).unwrap();
        assert_eq!(file_author.edge_count(), 1);
        // The excluded path was never interned as a node at all.
        assert!(!file_author
            .nodes()
            .any(|n| n.key().contains("readme")));
    }

    #[test]
    fn unsupported_backend_is_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let (good, git) = fixture_repo(&store, "https://github.com/test/good");
        commit_file(&git, "a.c", "1\n", "alice", "alice@x.com", 1000);
        let mut bad = Repository::from_url("https://github.com/test/bad", Category::Userland)
            .unwrap();
        bad.backend = BackendKind::Mercurial;

        let registry = Registry::from_repositories(vec![good, bad]).unwrap();
        let output = build(&registry, &Constraints::default(), &store).unwrap();
        assert_eq!(output.report.repos_mined, 1);
        assert_eq!(output.report.skipped.len(), 1);
        assert_eq!(output.report.skipped[0].repo, "test/bad");
        assert!(output.report.skipped[0].reason.contains("unsupported"));
    }

    #[test]
    fn missing_clone_is_fatal_for_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let absent =
            Repository::from_url("https://github.com/test/absent", Category::Userland).unwrap();
        let registry = Registry::from_repositories(vec![absent]).unwrap();
        let err = build(&registry, &Constraints::default(), &store).unwrap_err();
        assert!(matches!(err, TributaryError::SyncRequired(_)));
    }

    #[test]
    fn shared_commit_id_links_repositories_in_merge_graph() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let (upstream, git) = fixture_repo(&store, "https://github.com/test/upstream");
        commit_file(&git, "a.c", "shared\n", "alice", "alice@x.com", 1000);

        // A local clone shares the upstream commit id exactly.
        let fork = Repository::from_url("https://github.com/test/fork", Category::Userland)
            .unwrap();
        let fork_path = store.clone_path(&fork);
        std::fs::create_dir_all(fork_path.parent().unwrap()).unwrap();
        let fork_git = git2::Repository::clone(
            store.clone_path(&upstream).to_str().unwrap(),
            &fork_path,
        )
        .unwrap();
        commit_file(&fork_git, "b.c", "fork-only\n", "bob", "bob@x.com", 2000);

        let registry = Registry::from_repositories(vec![upstream, fork]).unwrap();
        let output = build(&registry, &Constraints::default(), &store).unwrap();

        let merge = output.store.get(REPO_MERGE).unwrap();
        assert_eq!(merge.edge_count(), 1);
        let upstream_node = NodeId::Repo("test/upstream".into());
        let fork_node = NodeId::Repo("test/fork".into());
        assert!(
            merge.weight_of(&upstream_node, &fork_node).is_some()
                || merge.weight_of(&fork_node, &upstream_node).is_some()
        );
    }

    #[test]
    fn repo_author_intensity_counts_commits_per_author() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let (repo, git) = fixture_repo(&store, "https://github.com/test/one");
        commit_file(&git, "a.c", "1\n", "alice", "alice@x.com", 1000);
        commit_file(&git, "b.c", "2\n", "alice", "alice@x.com", 2000);
        commit_file(&git, "a.c", "1\n3\n", "bob", "bob@x.com", 3000);

        let registry = Registry::from_repositories(vec![repo]).unwrap();
        let output = build(&registry, &Constraints::default(), &store).unwrap();

        let repo_author = output.store.get(REPO_AUTHOR).unwrap();
        let one = NodeId::Repo("test/one".into());
        assert_eq!(
            repo_author.weight_of(&one, &NodeId::Author("alice".into())),
            Some(2)
        );
        assert_eq!(
            repo_author.weight_of(&one, &NodeId::Author("bob".into())),
            Some(1)
        );
    }

    #[test]
    fn line_quantum_weights_edges_by_churn() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let (repo, git) = fixture_repo(&store, "https://github.com/test/one");
        commit_file(&git, "a.c", "1\n2\n3\n", "alice", "alice@x.com", 1000);

        let constraints = Constraints {
            quantum: Quantum::Line,
            ..Constraints::default()
        };
        let registry = Registry::from_repositories(vec![repo]).unwrap();
        let output = build(&registry, &constraints, &store).unwrap();

        let file_author = output.store.get(FILE_AUTHOR).unwrap();
        let weight = file_author.weight_of(
            &NodeId::File("a.c".into()),
            &NodeId::Author("alice".into()),
        );
        assert_eq!(weight, Some(3));
    }

    #[test]
    fn resolve_author_accepts_name_or_email() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let (repo, git) = fixture_repo(&store, "https://github.com/test/one");
        commit_file(&git, "a.c", "1\n", "alice", "alice@x.com", 1000);

        let registry = Registry::from_repositories(vec![repo]).unwrap();
        let output = build(&registry, &Constraints::default(), &store).unwrap();

        assert_eq!(
            resolve_author(&output.store, "alice@x.com").as_deref(),
            Some("alice")
        );
        assert_eq!(resolve_author(&output.store, "alice").as_deref(), Some("alice"));
        assert!(resolve_author(&output.store, "nobody@x.com").is_none());
    }
}
