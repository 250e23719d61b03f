//! Stage reader errors.
//!
//! Anything that goes wrong after the repository opened successfully is a
//! [`ReadError`] carrying the repository path and stage, so a failed shard
//! can be diagnosed without a retry. End-of-stream is *not* an error; it is
//! `Ok(None)` from the reader and never gets wrapped with context.

use std::path::PathBuf;

use thiserror::Error;

use crate::row::SchemaError;
use crate::stage::Stage;

/// A failure in one shard's row stream. Fatal to that shard only.
#[derive(Debug, Error)]
#[error("could not read {stage} stream of {}: {kind}", .path.display())]
pub struct ReadError {
    pub stage: Stage,
    pub path: PathBuf,
    #[source]
    pub kind: ReadErrorKind,
}

/// What went wrong, independent of which shard it happened in.
#[derive(Debug, Error)]
pub enum ReadErrorKind {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("'{hash}' is not a valid object hash")]
    BadHash { hash: String },

    #[error("no {expected} found for hash {hash}")]
    NotFound { hash: String, expected: &'static str },

    #[error("row violated the stage schema: {0}")]
    Schema(#[from] SchemaError),
}
