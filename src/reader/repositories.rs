//! Repository metadata stage: exactly one row per repository.

use git2::{ErrorCode, Repository};

use crate::reader::error::ReadError;
use crate::reader::{ReaderContext, StageReader};
use crate::row::{Row, Schema, Value};
use crate::source::ShardSpec;
use crate::stage::Stage;

pub struct RepositoriesReader<'repo> {
    repo: &'repo Repository,
    ctx: ReaderContext,
    done: bool,
}

impl<'repo> RepositoriesReader<'repo> {
    pub fn new(repo: &'repo Repository, spec: &ShardSpec) -> Self {
        Self {
            repo,
            ctx: ReaderContext::new(Stage::Repositories, &spec.repo_path),
            done: false,
        }
    }

    fn remote_urls(&self) -> Result<Vec<String>, ReadError> {
        let names = self.repo.remotes().map_err(|e| self.ctx.err(e))?;
        let mut urls = Vec::new();
        for name in names.iter().flatten() {
            let remote = self.repo.find_remote(name).map_err(|e| self.ctx.err(e))?;
            if let Some(url) = remote.url() {
                urls.push(url.to_string());
            }
        }
        Ok(urls)
    }

    /// The head commit hash, or empty for a repository with no commits yet.
    fn head_hash(&self) -> Result<String, ReadError> {
        match self.repo.head() {
            Ok(head) => Ok(head.target().map(|oid| oid.to_string()).unwrap_or_default()),
            Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(String::new()),
            Err(e) => Err(self.ctx.err(e)),
        }
    }
}

impl StageReader for RepositoriesReader<'_> {
    fn schema(&self) -> &'static Schema {
        Stage::Repositories.schema()
    }

    fn read(&mut self) -> Result<Option<Row>, ReadError> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let row = self.ctx.row(vec![
            self.ctx.id_cell(),
            Value::TextList(self.remote_urls()?),
            Value::Text(self.head_hash()?),
        ])?;
        Ok(Some(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn test_one_row_then_end_of_stream() {
        let (dir, repo, _c1, c2) = testutil::two_commit_repo();
        repo.remote("origin", "https://example.com/fixture.git").unwrap();

        let spec = ShardSpec::new(dir.path(), Stage::Repositories);
        let mut reader = RepositoriesReader::new(&repo, &spec);

        let row = reader.read().unwrap().expect("one repository row");
        assert_eq!(
            row.get("repositoryID").and_then(Value::as_text),
            Some(dir.path().display().to_string().as_str())
        );
        assert_eq!(
            row.get("repositoryURLs").and_then(Value::as_list),
            Some(&["https://example.com/fixture.git".to_string()][..])
        );
        assert_eq!(
            row.get("headHash").and_then(Value::as_text),
            Some(c2.to_string().as_str())
        );

        assert!(reader.read().unwrap().is_none());
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn test_no_remotes_and_unborn_head() {
        let (dir, repo) = testutil::init_repo();

        let spec = ShardSpec::new(dir.path(), Stage::Repositories);
        let mut reader = RepositoriesReader::new(&repo, &spec);

        let row = reader.read().unwrap().expect("row even for empty repo");
        assert_eq!(row.get("repositoryURLs").and_then(Value::as_list), Some(&[][..]));
        assert_eq!(row.get("headHash").and_then(Value::as_text), Some(""));
    }
}
