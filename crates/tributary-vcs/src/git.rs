//! Git-backed commit source via git2.
//!
//! Walks a local clone's history oldest-first, restricted to the
//! constraint window, and lazily extracts per-commit file touches with
//! line counts. Only commit ids are pre-resolved at open time (20 bytes
//! apiece); the expensive diff work happens one commit at a time as the
//! stream is drained, so memory stays bounded by the largest single
//! commit, not by history length.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use git2::{DiffOptions, Oid, Repository as GitRepository, Sort};
use tributary_core::{Commit, DateWindow, FileTouch, Repository, Result, TributaryError};

use crate::source::{CommitSource, CommitStream, SourceOptions};
use crate::sync::Store;

/// Commit source for [`BackendKind::Git`](tributary_core::BackendKind)
/// repositories, reading from the local store.
pub struct GitSource {
    store: Store,
    options: SourceOptions,
}

impl GitSource {
    /// Create a source reading clones out of `store`.
    pub fn new(store: Store, options: SourceOptions) -> Self {
        Self { store, options }
    }
}

impl CommitSource for GitSource {
    fn open(&self, repo: &Repository, window: &DateWindow) -> Result<Box<dyn CommitStream>> {
        let path = self.store.clone_path(repo);
        if !path.exists() {
            return Err(TributaryError::SyncRequired(repo.key()));
        }
        let stream = GitStream::open(&path, window, self.options.clone())?;
        Ok(Box::new(stream))
    }
}

/// A single-pass stream over one clone's in-window history.
pub struct GitStream {
    repo: GitRepository,
    pending: VecDeque<Oid>,
    options: SourceOptions,
}

impl GitStream {
    fn open(path: &Path, window: &DateWindow, options: SourceOptions) -> Result<Self> {
        let repo = GitRepository::open(path)
            .map_err(|e| TributaryError::Git(format!("failed to open {}: {e}", path.display())))?;

        let mut pending = VecDeque::new();
        {
            let mut revwalk = repo
                .revwalk()
                .map_err(|e| TributaryError::Git(format!("failed to create revwalk: {e}")))?;
            revwalk
                .set_sorting(Sort::TIME | Sort::REVERSE)
                .map_err(|e| TributaryError::Git(format!("failed to set sorting: {e}")))?;
            if let Err(e) = revwalk.push_head() {
                // An empty repository has no HEAD; that is an empty
                // stream, not an error.
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound
                {
                    drop(revwalk);
                    return Ok(Self {
                        repo,
                        pending,
                        options,
                    });
                }
                return Err(TributaryError::Git(format!("failed to push HEAD: {e}")));
            }

            // Oldest-first walk: seek past commits before the window,
            // stop at the first commit after it.
            for oid_result in revwalk {
                let oid =
                    oid_result.map_err(|e| TributaryError::Git(format!("revwalk error: {e}")))?;
                let commit = repo
                    .find_commit(oid)
                    .map_err(|e| TributaryError::Git(format!("failed to find commit: {e}")))?;
                let timestamp = commit.time().seconds();
                if timestamp > window.end {
                    break;
                }
                if window.contains(timestamp) {
                    pending.push_back(oid);
                }
            }
        }

        Ok(Self {
            repo,
            pending,
            options,
        })
    }

    fn load_commit(&self, oid: Oid) -> Result<Option<Commit>> {
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|e| TributaryError::Git(format!("failed to find commit: {e}")))?;

        let files = extract_touches(&self.repo, &commit)?;
        if files.len() > self.options.max_files_per_commit {
            return Ok(None);
        }

        let author = commit.author();
        Ok(Some(Commit {
            id: oid.to_string(),
            author: author.name().unwrap_or("unknown").to_string(),
            email: author.email().unwrap_or("unknown").to_string(),
            timestamp: commit.time().seconds(),
            files,
        }))
    }
}

impl CommitStream for GitStream {
    fn next_commit(&mut self) -> Result<Option<Commit>> {
        while let Some(oid) = self.pending.pop_front() {
            if let Some(commit) = self.load_commit(oid)? {
                return Ok(Some(commit));
            }
            // Oversized commit: skip and keep draining.
        }
        Ok(None)
    }
}

fn extract_touches(repo: &GitRepository, commit: &git2::Commit) -> Result<Vec<FileTouch>> {
    let commit_tree = commit
        .tree()
        .map_err(|e| TributaryError::Git(format!("failed to get commit tree: {e}")))?;

    // Diff against the first parent only; a merge commit's own touches
    // are what its author actually wrote.
    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| TributaryError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| TributaryError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    let diff = repo
        .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), Some(&mut diff_opts))
        .map_err(|e| TributaryError::Git(format!("failed to compute diff: {e}")))?;

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, (u64, u64)> = HashMap::new();

    for delta in diff.deltas() {
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .unwrap_or(Path::new(""))
            .to_string_lossy()
            .to_string();
        if path.is_empty() {
            continue;
        }
        if !counts.contains_key(&path) {
            order.push(path.clone());
            counts.insert(path, (0, 0));
        }
    }

    diff.foreach(
        &mut |_delta, _progress| true,
        None,
        None,
        Some(&mut |delta, _hunk, line| {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .unwrap_or(Path::new(""))
                .to_string_lossy()
                .to_string();
            if let Some(entry) = counts.get_mut(&path) {
                match line.origin() {
                    '+' => entry.0 += 1,
                    '-' => entry.1 += 1,
                    _ => {}
                }
            }
            true
        }),
    )
    .map_err(|e| TributaryError::Git(format!("failed to iterate diff lines: {e}")))?;

    Ok(order
        .into_iter()
        .map(|path| {
            let (lines_added, lines_deleted) = counts[&path];
            FileTouch {
                path,
                lines_added,
                lines_deleted,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary_core::Category;

    /// Write `contents` to `name` in the fixture repo and commit it with
    /// the given author and timestamp.
    fn commit_file(
        repo: &GitRepository,
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

    fn fixture() -> (tempfile::TempDir, Store, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let repo = Repository::from_url("https://github.com/test/fixture", Category::Userland)
            .unwrap();
        let path = store.clone_path(&repo);
        std::fs::create_dir_all(&path).unwrap();
        GitRepository::init(&path).unwrap();
        (dir, store, repo)
    }

    fn open_stream(
        store: &Store,
        repo: &Repository,
        window: &DateWindow,
    ) -> Box<dyn CommitStream> {
        GitSource::new(store.clone(), SourceOptions::default())
            .open(repo, window)
            .unwrap()
    }

    fn drain(stream: &mut dyn CommitStream) -> Vec<Commit> {
        let mut out = Vec::new();
        while let Some(c) = stream.next_commit().unwrap() {
            out.push(c);
        }
        out
    }

    #[test]
    fn missing_clone_reports_sync_required() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let repo =
            Repository::from_url("https://github.com/test/absent", Category::Userland).unwrap();
        let source = GitSource::new(store, SourceOptions::default());
        let err = source
            .open(
                &repo,
                &DateWindow {
                    start: None,
                    end: i64::MAX,
                },
            )
            .err()
            .unwrap();
        assert!(matches!(err, TributaryError::SyncRequired(key) if key == "test/absent"));
    }

    #[test]
    fn commits_arrive_in_ascending_time_order() {
        let (_dir, store, repo) = fixture();
        let git = GitRepository::open(store.clone_path(&repo)).unwrap();
        commit_file(&git, "a.c", "one\n", "alice", "alice@x.com", 1000);
        commit_file(&git, "a.c", "one\ntwo\n", "bob", "bob@x.com", 2000);
        commit_file(&git, "b.c", "three\n", "alice", "alice@x.com", 3000);

        let mut stream = open_stream(
            &store,
            &repo,
            &DateWindow {
                start: None,
                end: i64::MAX,
            },
        );
        let commits = drain(stream.as_mut());
        let times: Vec<i64> = commits.iter().map(|c| c.timestamp).collect();
        assert_eq!(times, vec![1000, 2000, 3000]);
        assert_eq!(commits[0].email, "alice@x.com");
        assert_eq!(commits[0].id.len(), 40);
    }

    #[test]
    fn window_bounds_are_honored_at_the_walk() {
        let (_dir, store, repo) = fixture();
        let git = GitRepository::open(store.clone_path(&repo)).unwrap();
        commit_file(&git, "a.c", "1\n", "alice", "alice@x.com", 1000);
        commit_file(&git, "a.c", "2\n", "alice", "alice@x.com", 2000);
        commit_file(&git, "a.c", "3\n", "alice", "alice@x.com", 3000);

        let mut stream = open_stream(
            &store,
            &repo,
            &DateWindow {
                start: Some(1500),
                end: 2500,
            },
        );
        let commits = drain(stream.as_mut());
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].timestamp, 2000);
    }

    #[test]
    fn empty_window_is_an_empty_stream_not_an_error() {
        let (_dir, store, repo) = fixture();
        let git = GitRepository::open(store.clone_path(&repo)).unwrap();
        commit_file(&git, "a.c", "1\n", "alice", "alice@x.com", 1000);

        let mut stream = open_stream(&store, &repo, &DateWindow { start: Some(5000), end: 6000 });
        assert!(stream.next_commit().unwrap().is_none());
    }

    #[test]
    fn empty_repository_is_an_empty_stream() {
        let (_dir, store, repo) = fixture();
        let mut stream = open_stream(
            &store,
            &repo,
            &DateWindow {
                start: None,
                end: i64::MAX,
            },
        );
        assert!(stream.next_commit().unwrap().is_none());
    }

    #[test]
    fn file_touches_carry_line_counts() {
        let (_dir, store, repo) = fixture();
        let git = GitRepository::open(store.clone_path(&repo)).unwrap();
        commit_file(&git, "kernel/io.c", "a\nb\nc\n", "alice", "alice@x.com", 1000);

        let mut stream = open_stream(
            &store,
            &repo,
            &DateWindow {
                start: None,
                end: i64::MAX,
            },
        );
        let commits = drain(stream.as_mut());
        assert_eq!(commits.len(), 1);
        let touch = &commits[0].files[0];
        assert_eq!(touch.path, "kernel/io.c");
        assert_eq!(touch.lines_added, 3);
        assert_eq!(touch.lines_deleted, 0);
    }
}
