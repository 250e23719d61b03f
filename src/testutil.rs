//! Test fixtures: real repositories built on disk with git2.

use std::collections::BTreeMap;

use git2::{Oid, Repository, Signature};
use tempfile::TempDir;

pub(crate) fn init_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    (dir, repo)
}

pub(crate) fn sig() -> Signature<'static> {
    Signature::now("Test", "test@example.com").unwrap()
}

/// Write a tree from (path, content) pairs. A `/` in a path nests the file
/// under a subtree; nesting may be arbitrarily deep.
pub(crate) fn write_tree(repo: &Repository, files: &[(&str, &str)]) -> Oid {
    let mut builder = repo.treebuilder(None).unwrap();
    let mut subdirs: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();

    for (path, content) in files {
        match path.split_once('/') {
            None => {
                let blob = repo.blob(content.as_bytes()).unwrap();
                builder.insert(*path, blob, 0o100644).unwrap();
            }
            Some((dir, rest)) => subdirs.entry(dir).or_default().push((rest, content)),
        }
    }

    for (dir, entries) in subdirs {
        let sub = write_tree(repo, &entries);
        builder.insert(dir, sub, 0o040000).unwrap();
    }

    builder.write().unwrap()
}

/// Create a commit without moving any ref unless `update_ref` says so.
pub(crate) fn commit(
    repo: &Repository,
    update_ref: Option<&str>,
    message: &str,
    tree: Oid,
    parents: &[Oid],
) -> Oid {
    let tree = repo.find_tree(tree).unwrap();
    let parents: Vec<git2::Commit> = parents
        .iter()
        .map(|&p| repo.find_commit(p).unwrap())
        .collect();
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    let s = sig();
    repo.commit(update_ref, &s, &s, message, &tree, &parent_refs)
        .unwrap()
}

/// The standard fixture from the end-to-end scenario: commits C1 -> C2,
/// `refs/heads/master` at C2, annotated tag `refs/tags/v1` at C1, HEAD
/// symbolic to master.
pub(crate) fn two_commit_repo() -> (TempDir, Repository, Oid, Oid) {
    let (dir, repo) = init_repo();

    let t1 = write_tree(&repo, &[("README.md", "one\n")]);
    let c1 = commit(&repo, None, "first", t1, &[]);

    let t2 = write_tree(&repo, &[("README.md", "two\n"), ("src/main.rs", "fn main() {}\n")]);
    let c2 = commit(&repo, None, "second", t2, &[c1]);

    repo.reference("refs/heads/master", c2, true, "fixture").unwrap();
    repo.set_head("refs/heads/master").unwrap();

    {
        let target = repo.find_object(c1, None).unwrap();
        repo.tag("v1", &target, &sig(), "release one", false).unwrap();
    }

    (dir, repo, c1, c2)
}
