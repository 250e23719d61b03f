//! Source side of the connector: discovery, shard specs, partitioning.
//!
//! A [`GitSource`] is built once from a validated [`SourceConfig`] and, when
//! materialized, expands its path into repositories, encodes one shard spec
//! per repository and spreads the encoded work units across a fixed number
//! of partitions. Generation runs once, synchronously, before any stage
//! reading begins; workers pick the partitions up from there.

mod discover;
mod error;
mod partition;
mod shard;

pub use discover::{discover, is_repository, WILDCARD};
pub use error::{DecodeError, DiscoverError, EncodeError, SourceError};
pub use partition::round_robin;
pub use shard::{ShardSpec, WIRE_VERSION};

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::stage::Stage;

/// An encoded shard spec, opaque to the engine that transports it.
pub type WorkUnit = Vec<u8>;

/// Everything a source needs, fixed up front.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Literal repository path, plain directory, or wildcard root.
    pub path: PathBuf,
    /// Stage every generated shard will read.
    pub stage: Stage,
    /// Number of output partitions; fixed for the life of the run.
    pub partitions: usize,
    /// Emit a header before each shard's first row.
    pub has_header: bool,
    /// Restrict the references stream to these full reference names.
    pub filter_refs: Vec<String>,
    /// Reachable-only commit traversal instead of a full object scan.
    pub reachable_only: bool,
    /// Indexed access: read commits or trees by these hashes, in order.
    pub hashes: Vec<String>,
    /// Free-form settings copied onto every shard spec.
    pub config: BTreeMap<String, String>,
}

impl SourceConfig {
    /// Defaults: one partition, header on, full scans.
    pub fn new(path: impl Into<PathBuf>, stage: Stage) -> Self {
        Self {
            path: path.into(),
            stage,
            partitions: 1,
            has_header: true,
            filter_refs: Vec::new(),
            reachable_only: false,
            hashes: Vec::new(),
            config: BTreeMap::new(),
        }
    }
}

/// A source over every repository under a path.
#[derive(Debug, Clone)]
pub struct GitSource {
    config: SourceConfig,
}

impl GitSource {
    /// Validate the configuration once and build the source.
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        if config.partitions == 0 {
            return Err(SourceError::InvalidConfig(
                "partition count must be at least 1".to_string(),
            ));
        }
        if !config.filter_refs.is_empty() && config.stage != Stage::References {
            return Err(SourceError::InvalidConfig(format!(
                "reference filter only applies to the references stage, not {}",
                config.stage
            )));
        }
        if config.reachable_only && config.stage != Stage::Commits {
            return Err(SourceError::InvalidConfig(format!(
                "reachable-only traversal only applies to the commits stage, not {}",
                config.stage
            )));
        }
        if !config.hashes.is_empty()
            && config.stage != Stage::Commits
            && config.stage != Stage::Trees
        {
            return Err(SourceError::InvalidConfig(format!(
                "hash-list access only applies to commits and trees, not {}",
                config.stage
            )));
        }
        Ok(Self { config })
    }

    /// The validated configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// One shard spec per discovered repository, in discovery order.
    pub fn shard_specs(&self) -> Result<Vec<ShardSpec>, SourceError> {
        let repos = discover(&self.config.path)?;
        log::info!(
            "discovered {} repositories under {}",
            repos.len(),
            self.config.path.display()
        );

        let specs = repos
            .into_iter()
            .map(|repo_path| ShardSpec {
                config: self.config.config.clone(),
                repo_path,
                stage: self.config.stage,
                has_header: self.config.has_header,
                filter_refs: self.config.filter_refs.clone(),
                reachable_only: self.config.reachable_only,
                hashes: self.config.hashes.clone(),
            })
            .collect();
        Ok(specs)
    }

    /// Discover, encode and partition: the full shard sequence, round-robin
    /// across `partitions` buckets of encoded work units.
    ///
    /// A spec that fails to encode aborts generation; an undeliverable
    /// shard cannot be retried, so the failure is logged and surfaced
    /// rather than silently dropped.
    pub fn generate(&self) -> Result<Vec<Vec<WorkUnit>>, SourceError> {
        let specs = self.shard_specs()?;

        let mut units = Vec::with_capacity(specs.len());
        for spec in &specs {
            let unit = spec.encode().map_err(|err| {
                log::error!(
                    "could not encode shard for {}: {}",
                    spec.repo_path.display(),
                    err
                );
                err
            })?;
            units.push(unit);
        }

        Ok(round_robin(units, self.config.partitions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_zero_partitions() {
        let mut config = SourceConfig::new("/tmp/repo", Stage::Commits);
        config.partitions = 0;
        assert!(matches!(
            GitSource::new(config),
            Err(SourceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_misplaced_options() {
        let mut config = SourceConfig::new("/tmp/repo", Stage::Blobs);
        config.filter_refs = vec!["refs/heads/main".to_string()];
        assert!(GitSource::new(config).is_err());

        let mut config = SourceConfig::new("/tmp/repo", Stage::Trees);
        config.reachable_only = true;
        assert!(GitSource::new(config).is_err());

        let mut config = SourceConfig::new("/tmp/repo", Stage::References);
        config.hashes = vec!["a".repeat(40)];
        assert!(GitSource::new(config).is_err());

        let mut config = SourceConfig::new("/tmp/repo", Stage::Trees);
        config.hashes = vec!["a".repeat(40)];
        assert!(GitSource::new(config).is_ok());
    }

    #[test]
    fn test_generate_partitions_every_repo() {
        let dir = TempDir::new().unwrap();
        for name in ["a", "b", "c", "d", "e"] {
            git2::Repository::init(dir.path().join(name)).unwrap();
        }

        let mut config = SourceConfig::new(dir.path().join("**"), Stage::Repositories);
        config.partitions = 2;
        let source = GitSource::new(config).unwrap();

        let partitions = source.generate().unwrap();
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].len(), 3);
        assert_eq!(partitions[1].len(), 2);

        // Every unit decodes back to a spec for one of the repos.
        for unit in partitions.iter().flatten() {
            let spec = ShardSpec::decode(unit).unwrap();
            assert_eq!(spec.stage, Stage::Repositories);
            assert!(spec.repo_path.starts_with(dir.path()));
        }
    }

    #[test]
    fn test_generate_missing_path_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = SourceConfig::new(dir.path().join("absent"), Stage::Commits);
        let source = GitSource::new(config).unwrap();
        assert!(matches!(
            source.generate(),
            Err(SourceError::Discover(DiscoverError::PathNotFound(_)))
        ));
    }
}
