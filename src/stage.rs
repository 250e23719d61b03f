//! The five pipeline stages and their row schemas.
//!
//! A stage names one projection of the repository object graph. The set is
//! closed: every shard requests exactly one stage, and the stage fixes the
//! row schema for the whole stream. Field order is part of the contract and
//! must never vary within one stream.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::row::{Field, Kind, Schema};

/// Which projection of the object graph a shard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Repositories,
    References,
    Commits,
    Trees,
    Blobs,
}

static REPOSITORIES: Schema = Schema::new(&[
    Field::new("repositoryID", Kind::Text),
    Field::new("repositoryURLs", Kind::TextList),
    Field::new("headHash", Kind::Text),
]);

static REFERENCES: Schema = Schema::new(&[
    Field::new("repositoryID", Kind::Text),
    Field::new("refHash", Kind::Text),
    Field::new("refName", Kind::Text),
    Field::new("commitHash", Kind::Text),
    Field::new("isRemote", Kind::Bool),
]);

static COMMITS: Schema = Schema::new(&[
    Field::new("repositoryID", Kind::Text),
    Field::new("commitHash", Kind::Text),
    Field::new("treeHash", Kind::Text),
    Field::new("parentHashes", Kind::TextList),
    Field::new("parentsCount", Kind::Int),
    Field::new("message", Kind::Text),
    Field::new("authorEmail", Kind::Text),
    Field::new("authorName", Kind::Text),
    Field::new("authorDate", Kind::Int),
    Field::new("committerEmail", Kind::Text),
    Field::new("committerName", Kind::Text),
    Field::new("committerDate", Kind::Int),
]);

static TREES: Schema = Schema::new(&[
    Field::new("repositoryID", Kind::Text),
    Field::new("blobHash", Kind::Text),
    Field::new("fileName", Kind::Text),
    Field::new("treeHash", Kind::Text),
    Field::new("blobSize", Kind::Int),
    Field::new("isBinary", Kind::Bool),
]);

static BLOBS: Schema = Schema::new(&[
    Field::new("repositoryID", Kind::Text),
    Field::new("blobHash", Kind::Text),
    Field::new("blobSize", Kind::Int),
]);

impl Stage {
    /// All stages, in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Repositories,
        Stage::References,
        Stage::Commits,
        Stage::Trees,
        Stage::Blobs,
    ];

    /// The stage's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Repositories => "repositories",
            Stage::References => "references",
            Stage::Commits => "commits",
            Stage::Trees => "trees",
            Stage::Blobs => "blobs",
        }
    }

    /// The fixed row schema for this stage.
    pub fn schema(&self) -> &'static Schema {
        match self {
            Stage::Repositories => &REPOSITORIES,
            Stage::References => &REFERENCES,
            Stage::Commits => &COMMITS,
            Stage::Trees => &TREES,
            Stage::Blobs => &BLOBS,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The string is not a stage name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stage '{0}' (expected repositories, references, commits, trees or blobs)")]
pub struct ParseStageError(pub String);

impl FromStr for Stage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "repositories" => Ok(Stage::Repositories),
            "references" => Ok(Stage::References),
            "commits" => Ok(Stage::Commits),
            "trees" => Ok(Stage::Trees),
            "blobs" => Ok(Stage::Blobs),
            other => Err(ParseStageError(other.to_string())),
        }
    }
}
