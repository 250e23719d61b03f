//! Blobs stage.
//!
//! One row per blob object: hash and byte size, never the content. Content
//! travels separately, fetched on demand by hash through
//! [`fetch_content`], so a downstream step pays for bytes only when it
//! asks for them.

use git2::{ObjectType, Oid, Repository};

use crate::reader::error::{ReadError, ReadErrorKind};
use crate::reader::{objects_of_kind, ReaderContext, StageReader};
use crate::row::{Row, Schema, Value};
use crate::source::ShardSpec;
use crate::stage::Stage;

pub struct BlobsReader<'repo> {
    repo: &'repo Repository,
    ctx: ReaderContext,
    oids: std::vec::IntoIter<Oid>,
}

impl<'repo> BlobsReader<'repo> {
    pub fn new(repo: &'repo Repository, spec: &ShardSpec) -> Result<Self, ReadError> {
        let ctx = ReaderContext::new(Stage::Blobs, &spec.repo_path);
        let oids = objects_of_kind(repo, ObjectType::Blob).map_err(|e| ctx.err(e))?;
        Ok(Self {
            repo,
            ctx,
            oids: oids.into_iter(),
        })
    }
}

impl StageReader for BlobsReader<'_> {
    fn schema(&self) -> &'static Schema {
        Stage::Blobs.schema()
    }

    fn read(&mut self) -> Result<Option<Row>, ReadError> {
        let Some(oid) = self.oids.next() else {
            return Ok(None);
        };
        let blob = self.repo.find_blob(oid).map_err(|e| self.ctx.err(e))?;

        let row = self.ctx.row(vec![
            self.ctx.id_cell(),
            Value::Text(oid.to_string()),
            Value::Int(blob.size() as i64),
        ])?;
        Ok(Some(row))
    }
}

/// Fetch one blob's raw content by hash.
///
/// An empty or all-zero hash is a no-op returning no bytes, so callers can
/// pass hash cells through without special-casing placeholder values.
pub fn fetch_content(
    repo: &Repository,
    repo_path: &std::path::Path,
    hash: &str,
) -> Result<Vec<u8>, ReadError> {
    let ctx = ReaderContext::new(Stage::Blobs, repo_path);

    if hash.is_empty() {
        return Ok(Vec::new());
    }
    let oid = Oid::from_str(hash).map_err(|_| {
        ctx.err(ReadErrorKind::BadHash {
            hash: hash.to_string(),
        })
    })?;
    if oid.is_zero() {
        return Ok(Vec::new());
    }

    let blob = repo.find_blob(oid).map_err(|_| {
        ctx.err(ReadErrorKind::NotFound {
            hash: hash.to_string(),
            expected: "blob",
        })
    })?;
    Ok(blob.content().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use std::collections::BTreeSet;

    #[test]
    fn test_every_blob_once() {
        let (dir, repo, _c1, _c2) = testutil::two_commit_repo();

        let spec = ShardSpec::new(dir.path(), Stage::Blobs);
        let mut reader = BlobsReader::new(&repo, &spec).unwrap();

        let mut hashes = BTreeSet::new();
        let mut count = 0;
        while let Some(row) = reader.read().unwrap() {
            hashes.insert(row.get("blobHash").and_then(Value::as_text).unwrap().to_string());
            assert!(row.get("blobSize").and_then(Value::as_int).unwrap() > 0);
            count += 1;
        }

        // Fixture blobs: "one\n", "two\n", "fn main() {}\n".
        assert_eq!(count, 3);
        assert_eq!(hashes.len(), count);
    }

    #[test]
    fn test_fetch_content_by_hash() {
        let (dir, repo) = testutil::init_repo();
        let blob = repo.blob(b"payload").unwrap();

        let content = fetch_content(&repo, dir.path(), &blob.to_string()).unwrap();
        assert_eq!(content, b"payload");
    }

    #[test]
    fn test_fetch_empty_and_zero_hash_are_noops() {
        let (dir, repo) = testutil::init_repo();
        assert!(fetch_content(&repo, dir.path(), "").unwrap().is_empty());

        let zero = "0".repeat(40);
        assert!(fetch_content(&repo, dir.path(), &zero).unwrap().is_empty());
    }

    #[test]
    fn test_fetch_unknown_hash_fails() {
        let (dir, repo) = testutil::init_repo();
        let err = fetch_content(&repo, dir.path(), &"d".repeat(40)).unwrap_err();
        assert!(matches!(err.kind, ReadErrorKind::NotFound { expected: "blob", .. }));
    }
}
