//! References stage.
//!
//! Iterates every reference once (HEAD included), resolving each down to
//! the commit it ultimately designates: symbolic references are followed to
//! their underlying reference first, then annotated tags are peeled to the
//! commit they target. The row keeps both the pre-peel hash and the
//! resolved commit hash. References to unborn branches carry no hash and
//! are skipped.

use git2::{Reference, References, Repository};

use crate::reader::error::ReadError;
use crate::reader::{peel_tags, ReaderContext, StageReader};
use crate::row::{Row, Schema, Value};
use crate::source::ShardSpec;
use crate::stage::Stage;

enum RefCursor<'repo> {
    /// Full scan: HEAD first, then everything under refs/.
    All {
        head: Option<Reference<'repo>>,
        refs: References<'repo>,
    },
    /// Explicit filter: look each listed name up directly.
    Named(std::vec::IntoIter<String>),
}

pub struct ReferencesReader<'repo> {
    repo: &'repo Repository,
    ctx: ReaderContext,
    cursor: RefCursor<'repo>,
}

impl<'repo> ReferencesReader<'repo> {
    pub fn new(repo: &'repo Repository, spec: &ShardSpec) -> Result<Self, ReadError> {
        let ctx = ReaderContext::new(Stage::References, &spec.repo_path);

        let cursor = if spec.filter_refs.is_empty() {
            RefCursor::All {
                head: repo.find_reference("HEAD").ok(),
                refs: repo.references().map_err(|e| ctx.err(e))?,
            }
        } else {
            RefCursor::Named(spec.filter_refs.clone().into_iter())
        };

        Ok(Self { repo, ctx, cursor })
    }

    fn next_reference(&mut self) -> Result<Option<Reference<'repo>>, ReadError> {
        match &mut self.cursor {
            RefCursor::All { head, refs } => {
                if let Some(head) = head.take() {
                    return Ok(Some(head));
                }
                match refs.next() {
                    None => Ok(None),
                    Some(result) => result.map(Some).map_err(|e| self.ctx.err(e)),
                }
            }
            RefCursor::Named(names) => match names.next() {
                None => Ok(None),
                Some(name) => self
                    .repo
                    .find_reference(&name)
                    .map(Some)
                    .map_err(|e| self.ctx.err(e)),
            },
        }
    }
}

impl StageReader for ReferencesReader<'_> {
    fn schema(&self) -> &'static Schema {
        Stage::References.schema()
    }

    fn read(&mut self) -> Result<Option<Row>, ReadError> {
        loop {
            let Some(reference) = self.next_reference()? else {
                return Ok(None);
            };

            let name = String::from_utf8_lossy(reference.name_bytes()).into_owned();
            let is_remote = reference.is_remote();

            // Symbolic references point at another reference by name;
            // follow to the underlying reference before anything else.
            // A symbolic reference to an unborn branch (HEAD in a fresh
            // repository) designates no commit and is skipped.
            let resolved = match reference.resolve() {
                Ok(resolved) => resolved,
                Err(e) if e.code() == git2::ErrorCode::NotFound => continue,
                Err(e) => return Err(self.ctx.err(e)),
            };
            let Some(target) = resolved.target() else {
                continue;
            };

            let commit = peel_tags(self.repo, target);

            let row = self.ctx.row(vec![
                self.ctx.id_cell(),
                Value::Text(target.to_string()),
                Value::Text(name),
                Value::Text(commit.to_string()),
                Value::Bool(is_remote),
            ])?;
            return Ok(Some(row));
        }
    }
}
