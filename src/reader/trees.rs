//! Trees stage.
//!
//! A two-level stream: the outer sequence visits tree objects, the inner
//! sequence visits the flattened file listing of the current tree (nested
//! blobs with their full path inside the tree). The reader is an explicit
//! two-state machine; when a tree's files run out it moves back to the
//! outer position and keeps going, so an empty tree costs a state hop but
//! never produces a row, and callers only ever see real rows or the end of
//! the stream.

use git2::{ObjectType, Oid, Repository, Tree, TreeWalkMode, TreeWalkResult};

use crate::reader::error::{ReadError, ReadErrorKind};
use crate::reader::{objects_of_kind, ReaderContext, StageReader};
use crate::row::{Row, Schema, Value};
use crate::source::ShardSpec;
use crate::stage::Stage;

struct FileEntry {
    path: String,
    blob: Oid,
}

enum TreeCursor {
    Scan(std::vec::IntoIter<Oid>),
    ByHash(std::vec::IntoIter<String>),
}

enum TreeState {
    NeedTree,
    InTree {
        tree_hash: String,
        files: std::vec::IntoIter<FileEntry>,
    },
}

pub struct TreesReader<'repo> {
    repo: &'repo Repository,
    ctx: ReaderContext,
    cursor: TreeCursor,
    state: TreeState,
}

impl<'repo> TreesReader<'repo> {
    /// Every tree object in the store, each visited once.
    pub fn all(repo: &'repo Repository, spec: &ShardSpec) -> Result<Self, ReadError> {
        let ctx = ReaderContext::new(Stage::Trees, &spec.repo_path);
        let oids = objects_of_kind(repo, ObjectType::Tree).map_err(|e| ctx.err(e))?;
        Ok(Self {
            repo,
            ctx,
            cursor: TreeCursor::Scan(oids.into_iter()),
            state: TreeState::NeedTree,
        })
    }

    /// Indexed access: outer positions seeded from the supplied hashes.
    pub fn by_hashes(repo: &'repo Repository, spec: &ShardSpec) -> Self {
        Self {
            repo,
            ctx: ReaderContext::new(Stage::Trees, &spec.repo_path),
            cursor: TreeCursor::ByHash(spec.hashes.clone().into_iter()),
            state: TreeState::NeedTree,
        }
    }

    fn next_tree(&mut self) -> Result<Option<Tree<'repo>>, ReadError> {
        match &mut self.cursor {
            TreeCursor::Scan(oids) => match oids.next() {
                None => Ok(None),
                Some(oid) => self
                    .repo
                    .find_tree(oid)
                    .map(Some)
                    .map_err(|e| self.ctx.err(e)),
            },
            TreeCursor::ByHash(hashes) => match hashes.next() {
                None => Ok(None),
                Some(hash) => {
                    let oid = Oid::from_str(&hash)
                        .map_err(|_| self.ctx.err(ReadErrorKind::BadHash { hash: hash.clone() }))?;
                    self.repo.find_tree(oid).map(Some).map_err(|_| {
                        self.ctx.err(ReadErrorKind::NotFound {
                            hash,
                            expected: "tree",
                        })
                    })
                }
            },
        }
    }
}

/// Flatten a tree into its file entries, nested blobs included, with their
/// full path relative to the tree root. Submodule entries are not files.
fn flatten_files(tree: &Tree<'_>) -> Result<Vec<FileEntry>, git2::Error> {
    let mut files = Vec::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            let name = String::from_utf8_lossy(entry.name_bytes());
            files.push(FileEntry {
                path: format!("{}{}", root, name),
                blob: entry.id(),
            });
        }
        TreeWalkResult::Ok
    })?;
    Ok(files)
}

impl StageReader for TreesReader<'_> {
    fn schema(&self) -> &'static Schema {
        Stage::Trees.schema()
    }

    fn read(&mut self) -> Result<Option<Row>, ReadError> {
        loop {
            // Take the state out so the cursor can be advanced while the
            // inner iterator is in hand; a fallible step leaves the reader
            // parked at NeedTree, which is fine since an erroring shard is
            // abandoned anyway.
            match std::mem::replace(&mut self.state, TreeState::NeedTree) {
                TreeState::NeedTree => {
                    let Some(tree) = self.next_tree()? else {
                        return Ok(None);
                    };
                    let files = flatten_files(&tree).map_err(|e| self.ctx.err(e))?;
                    self.state = TreeState::InTree {
                        tree_hash: tree.id().to_string(),
                        files: files.into_iter(),
                    };
                }
                TreeState::InTree { tree_hash, mut files } => match files.next() {
                    // Inner listing exhausted: fall through to the next
                    // outer tree on the following loop turn.
                    None => {}
                    Some(entry) => {
                        let blob = self
                            .repo
                            .find_blob(entry.blob)
                            .map_err(|e| self.ctx.err(e))?;
                        let row = self.ctx.row(vec![
                            self.ctx.id_cell(),
                            Value::Text(entry.blob.to_string()),
                            Value::Text(entry.path),
                            Value::Text(tree_hash.clone()),
                            Value::Int(blob.size() as i64),
                            Value::Bool(blob.is_binary()),
                        ])?;
                        self.state = TreeState::InTree { tree_hash, files };
                        return Ok(Some(row));
                    }
                },
            }
        }
    }
}
