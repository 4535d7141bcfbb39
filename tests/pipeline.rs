//! End-to-end pipeline test: list file → sync → build → project → rank.

use std::path::Path;

use tributary_core::{CentralityKind, Constraints};
use tributary_graph::builder::{self, build_graphs};
use tributary_graph::centrality::centrality;
use tributary_graph::project::{project, Decay};
use tributary_vcs::registry::Registry;
use tributary_vcs::source::SourceOptions;
use tributary_vcs::sync::{Store, SyncAction};

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

#[test]
fn list_file_to_ranked_authors() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path();

    // Upstream repository alice, bob, and carol contribute to. Bob is
    // the only bridge: he shares core.c with alice and lib.c with carol.
    let upstream = data_dir.join("upstream");
    let git = git2::Repository::init(&upstream).unwrap();
    commit_file(&git, "core.c", "a\n", "alice", "alice@x.com", 1000);
    commit_file(&git, "core.c", "a\nb\n", "bob", "bob@x.com", 2000);
    commit_file(&git, "lib.c", "b\n", "bob", "bob@x.com", 3000);
    commit_file(&git, "lib.c", "b\nc\n", "carol", "carol@x.com", 4000);

    let lists = data_dir.join("lists");
    std::fs::create_dir_all(&lists).unwrap();
    std::fs::write(
        lists.join("userland"),
        format!("# local fixture\nfile://{}\n", upstream.display()),
    )
    .unwrap();

    let registry = Registry::load(data_dir).unwrap();
    assert_eq!(registry.len(), 1);

    // First sync clones, second fetches.
    let store = Store::new(data_dir.join("stor"));
    let outcomes = store.sync_all(&registry).unwrap();
    assert_eq!(outcomes[0].action, SyncAction::Cloned);
    let outcomes = store.sync_all(&registry).unwrap();
    assert_eq!(outcomes[0].action, SyncAction::Fetched);

    let constraints = Constraints::default();
    let output =
        build_graphs(&registry, &constraints, &store, &SourceOptions::default()).unwrap();
    assert_eq!(output.report.repos_mined, 1);
    assert_eq!(output.report.commits_folded, 4);
    assert!(output.report.skipped.is_empty());

    let projected = project(&output.store, builder::FILE_AUTHOR, &Decay::Constant, 256).unwrap();
    assert_eq!(projected.node_count(), 3);
    assert_eq!(projected.edge_count(), 2);

    let ranked = centrality(&projected, &constraints);
    assert_eq!(ranked[0].author, "bob");
    assert_eq!(ranked[0].score, 2.0);

    let between = Constraints {
        kind: CentralityKind::Betweenness,
        ..Constraints::default()
    };
    let ranked = centrality(&projected, &between);
    assert_eq!(ranked[0].author, "bob");
    assert_eq!(ranked[0].score, 1.0);
    assert_eq!(ranked[1].score, 0.0);
}

#[test]
fn date_window_narrows_the_ranking() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path();

    let upstream = data_dir.join("upstream");
    let git = git2::Repository::init(&upstream).unwrap();
    commit_file(&git, "core.c", "a\n", "alice", "alice@x.com", 1000);
    commit_file(&git, "core.c", "a\nb\n", "bob", "bob@x.com", 500_000);

    let lists = data_dir.join("lists");
    std::fs::create_dir_all(&lists).unwrap();
    std::fs::write(
        lists.join("userland"),
        format!("file://{}\n", upstream.display()),
    )
    .unwrap();
    let registry = Registry::load(data_dir).unwrap();
    let store = Store::new(data_dir.join("stor"));
    store.sync_all(&registry).unwrap();

    // Only alice's commit falls inside the window, so no pair forms.
    let constraints = Constraints {
        until: chrono::DateTime::from_timestamp(2000, 0),
        ..Constraints::default()
    };
    let output =
        build_graphs(&registry, &constraints, &store, &SourceOptions::default()).unwrap();
    assert_eq!(output.report.commits_folded, 1);

    // No pair shares the file inside the window, so the projection and
    // the ranking both come out empty without an error.
    let projected = project(&output.store, builder::FILE_AUTHOR, &Decay::Constant, 256).unwrap();
    assert!(projected.is_empty());
    assert!(centrality(&projected, &constraints).is_empty());
}
