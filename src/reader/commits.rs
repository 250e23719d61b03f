//! Commits stage.
//!
//! Three access modes share one reader:
//!
//! - *all*: every commit object in the store, reference membership ignored;
//! - *reachable-only*: a revision walk seeded with the commit each
//!   reference points at; a commit reached through several references is
//!   still emitted exactly once;
//! - *by hash list*: direct lookup of externally supplied hashes, one row
//!   per hash, in list order.

use git2::{Commit, ObjectType, Oid, Repository, Revwalk, Sort};

use crate::reader::error::{ReadError, ReadErrorKind};
use crate::reader::{objects_of_kind, peel_tags, ReaderContext, StageReader};
use crate::row::{Row, Schema, Value};
use crate::source::ShardSpec;
use crate::stage::Stage;

enum CommitCursor<'repo> {
    Scan(std::vec::IntoIter<Oid>),
    Walk(Revwalk<'repo>),
    ByHash(std::vec::IntoIter<String>),
}

pub struct CommitsReader<'repo> {
    repo: &'repo Repository,
    ctx: ReaderContext,
    cursor: CommitCursor<'repo>,
}

impl<'repo> CommitsReader<'repo> {
    /// Every commit object in the odb, once.
    pub fn all(repo: &'repo Repository, spec: &ShardSpec) -> Result<Self, ReadError> {
        let ctx = ReaderContext::new(Stage::Commits, &spec.repo_path);
        let oids = objects_of_kind(repo, ObjectType::Commit).map_err(|e| ctx.err(e))?;
        Ok(Self {
            repo,
            ctx,
            cursor: CommitCursor::Scan(oids.into_iter()),
        })
    }

    /// Only commits reachable from some reference.
    ///
    /// The seed set is the commit each reference directly points at
    /// (annotated tags peeled); references are few even in very large
    /// repositories, so holding the set in memory is fine. The walk itself
    /// deduplicates, whatever the seed overlap.
    pub fn reachable(repo: &'repo Repository, spec: &ShardSpec) -> Result<Self, ReadError> {
        let ctx = ReaderContext::new(Stage::Commits, &spec.repo_path);

        let mut walk = repo.revwalk().map_err(|e| ctx.err(e))?;
        walk.set_sorting(Sort::NONE).map_err(|e| ctx.err(e))?;

        let refs = repo.references().map_err(|e| ctx.err(e))?;
        for reference in refs {
            let reference = reference.map_err(|e| ctx.err(e))?;
            let Some(target) = reference.resolve().ok().and_then(|r| r.target()) else {
                continue;
            };
            let commit = peel_tags(repo, target);
            if repo.find_commit(commit).is_ok() {
                walk.push(commit).map_err(|e| ctx.err(e))?;
            }
        }

        Ok(Self {
            repo,
            ctx,
            cursor: CommitCursor::Walk(walk),
        })
    }

    /// Indexed access: one row per supplied hash, in list order.
    pub fn by_hashes(repo: &'repo Repository, spec: &ShardSpec) -> Self {
        Self {
            repo,
            ctx: ReaderContext::new(Stage::Commits, &spec.repo_path),
            cursor: CommitCursor::ByHash(spec.hashes.clone().into_iter()),
        }
    }

    fn next_commit(&mut self) -> Result<Option<Commit<'repo>>, ReadError> {
        let oid = match &mut self.cursor {
            CommitCursor::Scan(oids) => match oids.next() {
                None => return Ok(None),
                Some(oid) => oid,
            },
            CommitCursor::Walk(walk) => match walk.next() {
                None => return Ok(None),
                Some(result) => result.map_err(|e| self.ctx.err(e))?,
            },
            CommitCursor::ByHash(hashes) => match hashes.next() {
                None => return Ok(None),
                Some(hash) => {
                    let oid = Oid::from_str(&hash)
                        .map_err(|_| self.ctx.err(ReadErrorKind::BadHash { hash: hash.clone() }))?;
                    return self
                        .repo
                        .find_commit(oid)
                        .map(Some)
                        .map_err(|_| self.ctx.err(ReadErrorKind::NotFound {
                            hash,
                            expected: "commit",
                        }));
                }
            },
        };

        self.repo
            .find_commit(oid)
            .map(Some)
            .map_err(|e| self.ctx.err(e))
    }

    fn commit_row(&self, commit: &Commit<'_>) -> Result<Row, ReadError> {
        let parents: Vec<String> = commit.parent_ids().map(|oid| oid.to_string()).collect();
        let parent_count = parents.len() as i64;
        let author = commit.author();
        let committer = commit.committer();

        self.ctx.row(vec![
            self.ctx.id_cell(),
            Value::Text(commit.id().to_string()),
            Value::Text(commit.tree_id().to_string()),
            Value::TextList(parents),
            Value::Int(parent_count),
            Value::Text(commit.message().unwrap_or("").to_string()),
            Value::Text(author.email().unwrap_or("").to_string()),
            Value::Text(author.name().unwrap_or("").to_string()),
            Value::Int(author.when().seconds()),
            Value::Text(committer.email().unwrap_or("").to_string()),
            Value::Text(committer.name().unwrap_or("").to_string()),
            Value::Int(committer.when().seconds()),
        ])
    }
}

impl StageReader for CommitsReader<'_> {
    fn schema(&self) -> &'static Schema {
        Stage::Commits.schema()
    }

    fn read(&mut self) -> Result<Option<Row>, ReadError> {
        match self.next_commit()? {
            None => Ok(None),
            Some(commit) => Ok(Some(self.commit_row(&commit)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use std::collections::BTreeSet;

    fn commit_hashes(reader: &mut CommitsReader<'_>) -> Vec<String> {
        let mut hashes = Vec::new();
        while let Some(row) = reader.read().unwrap() {
            hashes.push(row.get("commitHash").and_then(Value::as_text).unwrap().to_string());
        }
        hashes
    }

    /// Fixture plus one commit no reference can reach.
    fn repo_with_orphan() -> (tempfile::TempDir, git2::Repository, Oid, Oid, Oid) {
        let (dir, repo, c1, c2) = testutil::two_commit_repo();
        let tree = testutil::write_tree(&repo, &[("orphan.txt", "lost\n")]);
        let orphan = testutil::commit(&repo, None, "orphan", tree, &[]);
        (dir, repo, c1, c2, orphan)
    }

    #[test]
    fn test_reachable_only_excludes_orphans() {
        let (dir, repo, c1, c2, orphan) = repo_with_orphan();

        let mut spec = ShardSpec::new(dir.path(), Stage::Commits);
        spec.reachable_only = true;
        let mut reader = CommitsReader::reachable(&repo, &spec).unwrap();

        let hashes = commit_hashes(&mut reader);
        assert_eq!(hashes.len(), 2, "no duplicates");

        let got: BTreeSet<String> = hashes.iter().cloned().collect();
        let expected: BTreeSet<String> = [c1, c2].iter().map(|oid| oid.to_string()).collect();
        assert_eq!(got, expected);
        assert!(!hashes.contains(&orphan.to_string()));
    }

    #[test]
    fn test_all_commits_includes_orphans() {
        let (dir, repo, c1, c2, orphan) = repo_with_orphan();

        let spec = ShardSpec::new(dir.path(), Stage::Commits);
        let mut reader = CommitsReader::all(&repo, &spec).unwrap();

        let hashes: BTreeSet<String> = commit_hashes(&mut reader).into_iter().collect();
        let expected: BTreeSet<String> =
            [c1, c2, orphan].iter().map(|oid| oid.to_string()).collect();
        assert_eq!(hashes, expected);
    }

    #[test]
    fn test_many_refs_one_emission() {
        let (dir, repo, _c1, c2) = testutil::two_commit_repo();
        // Several references at the same commit must not duplicate it.
        repo.reference("refs/heads/dev", c2, true, "fixture").unwrap();
        repo.reference("refs/heads/release", c2, true, "fixture").unwrap();

        let mut spec = ShardSpec::new(dir.path(), Stage::Commits);
        spec.reachable_only = true;
        let mut reader = CommitsReader::reachable(&repo, &spec).unwrap();

        let hashes = commit_hashes(&mut reader);
        assert_eq!(hashes.len(), 2);
    }

    #[test]
    fn test_row_fields() {
        let (dir, repo, c1, c2) = testutil::two_commit_repo();

        let mut spec = ShardSpec::new(dir.path(), Stage::Commits);
        spec.hashes = vec![c2.to_string()];
        let mut reader = CommitsReader::by_hashes(&repo, &spec);

        let row = reader.read().unwrap().unwrap();
        assert_eq!(
            row.get("parentHashes").and_then(Value::as_list),
            Some(&[c1.to_string()][..])
        );
        assert_eq!(row.get("parentsCount").and_then(Value::as_int), Some(1));
        assert_eq!(row.get("message").and_then(Value::as_text), Some("second"));
        assert_eq!(
            row.get("authorEmail").and_then(Value::as_text),
            Some("test@example.com")
        );
        assert!(row.get("authorDate").and_then(Value::as_int).unwrap() > 0);
    }

    #[test]
    fn test_by_hashes_in_list_order() {
        let (dir, repo, c1, c2) = testutil::two_commit_repo();

        let mut spec = ShardSpec::new(dir.path(), Stage::Commits);
        spec.hashes = vec![c2.to_string(), c1.to_string()];
        let mut reader = CommitsReader::by_hashes(&repo, &spec);

        let hashes = commit_hashes(&mut reader);
        assert_eq!(hashes, vec![c2.to_string(), c1.to_string()]);
    }

    #[test]
    fn test_by_hashes_miss_is_read_error() {
        let (dir, repo, _c1, _c2) = testutil::two_commit_repo();

        let mut spec = ShardSpec::new(dir.path(), Stage::Commits);
        spec.hashes = vec!["f".repeat(40)];
        let mut reader = CommitsReader::by_hashes(&repo, &spec);

        let err = reader.read().unwrap_err();
        assert!(matches!(err.kind, ReadErrorKind::NotFound { expected: "commit", .. }));
    }
}
