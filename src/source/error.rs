//! Errors raised while turning a path into partitioned shards.
//!
//! Discovery errors are fatal to the whole generation run: a source that
//! cannot enumerate its repositories has no partial result worth keeping.

use std::path::PathBuf;

use thiserror::Error;

/// Repository discovery failed.
#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("could not list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A shard spec could not be serialized for transport.
#[derive(Debug, Error)]
#[error("could not encode shard spec: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// An encoded work unit could not be turned back into a shard spec.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed shard spec: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported shard spec version {got} (this build speaks version {supported})")]
    UnsupportedVersion { got: u32, supported: u32 },
}

/// Anything that can abort source generation.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Discover(#[from] DiscoverError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("invalid source configuration: {0}")]
    InvalidConfig(String),
}
