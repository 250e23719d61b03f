//! The five stage readers.
//!
//! Every reader follows the same two-method contract: the header is the
//! stage's ordered field names, and `read` yields the next row or `Ok(None)`
//! once the stream is exhausted. Readers are strictly sequential; a reader
//! instance is private to the shard that created it and is never shared.
//!
//! Construction goes through [`new_reader`], which dispatches once on the
//! shard's stage variant and hands back a uniform reader capability.

mod blobs;
mod commits;
mod error;
mod references;
mod repositories;
mod trees;

pub use blobs::{fetch_content, BlobsReader};
pub use commits::CommitsReader;
pub use error::{ReadError, ReadErrorKind};
pub use references::ReferencesReader;
pub use repositories::RepositoriesReader;
pub use trees::TreesReader;

use std::path::Path;

use git2::{ObjectType, Oid, Repository};

use crate::row::{Row, Schema, Value};
use crate::source::ShardSpec;
use crate::stage::Stage;

/// Uniform reading capability over one shard's row stream.
pub trait StageReader {
    /// The fixed schema of this stream's rows.
    fn schema(&self) -> &'static Schema;

    /// Ordered field names, the stage's header row.
    fn header(&self) -> Vec<&'static str> {
        self.schema().names()
    }

    /// The next row, or `Ok(None)` at end of stream.
    fn read(&mut self) -> Result<Option<Row>, ReadError>;
}

/// Build the reader for the shard's requested stage.
pub fn new_reader<'repo>(
    repo: &'repo Repository,
    spec: &ShardSpec,
) -> Result<Box<dyn StageReader + 'repo>, ReadError> {
    match spec.stage {
        Stage::Repositories => Ok(Box::new(RepositoriesReader::new(repo, spec))),
        Stage::References => Ok(Box::new(ReferencesReader::new(repo, spec)?)),
        Stage::Commits => {
            if !spec.hashes.is_empty() {
                Ok(Box::new(CommitsReader::by_hashes(repo, spec)))
            } else if spec.reachable_only {
                Ok(Box::new(CommitsReader::reachable(repo, spec)?))
            } else {
                Ok(Box::new(CommitsReader::all(repo, spec)?))
            }
        }
        Stage::Trees => {
            if !spec.hashes.is_empty() {
                Ok(Box::new(TreesReader::by_hashes(repo, spec)))
            } else {
                Ok(Box::new(TreesReader::all(repo, spec)?))
            }
        }
        Stage::Blobs => Ok(Box::new(BlobsReader::new(repo, spec)?)),
    }
}

/// Shared per-reader context: which stream this is, for error reporting and
/// the repositoryID cell.
pub(crate) struct ReaderContext {
    stage: Stage,
    path: std::path::PathBuf,
    repository_id: String,
}

impl ReaderContext {
    pub(crate) fn new(stage: Stage, path: &Path) -> Self {
        Self {
            stage,
            path: path.to_path_buf(),
            repository_id: path.display().to_string(),
        }
    }

    /// The repositoryID cell every row of this stream starts with.
    pub(crate) fn id_cell(&self) -> Value {
        Value::Text(self.repository_id.clone())
    }

    pub(crate) fn err(&self, kind: impl Into<ReadErrorKind>) -> ReadError {
        ReadError {
            stage: self.stage,
            path: self.path.clone(),
            kind: kind.into(),
        }
    }

    /// Build a schema-checked row for this stream's stage.
    pub(crate) fn row(&self, cells: Vec<Value>) -> Result<Row, ReadError> {
        self.stage.schema().row(cells).map_err(|e| self.err(e))
    }
}

/// Collect the ids of every loose and packed object of one kind, in the
/// object store's native order.
pub(crate) fn objects_of_kind(
    repo: &Repository,
    kind: ObjectType,
) -> Result<Vec<Oid>, git2::Error> {
    let odb = repo.odb()?;
    let mut oids = Vec::new();
    let mut walk_err: Option<git2::Error> = None;

    odb.foreach(|oid| match odb.read_header(*oid) {
        Ok((_, k)) if k == kind => {
            oids.push(*oid);
            true
        }
        Ok(_) => true,
        Err(e) => {
            walk_err = Some(e);
            false
        }
    })?;

    if let Some(e) = walk_err {
        return Err(e);
    }
    Ok(oids)
}

/// Follow a chain of annotated tag objects down to whatever they finally
/// designate. Non-tag ids pass through unchanged.
pub(crate) fn peel_tags(repo: &Repository, mut oid: Oid) -> Oid {
    while let Ok(tag) = repo.find_tag(oid) {
        oid = tag.target_id();
    }
    oid
}
