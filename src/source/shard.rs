//! Shard specs: the self-contained unit of work handed to a worker.
//!
//! A shard names one repository, one stage and the read options for that
//! stream. Specs cross a process (or machine) boundary as bytes, so the
//! wire form is an explicit versioned record; the only hard contract is
//! that decoding an encoded spec reproduces an equal value. Cross-version
//! compatibility is limited to rejecting unknown versions loudly instead
//! of misreading them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::source::error::{DecodeError, EncodeError};
use crate::stage::Stage;

/// Wire format version this build writes and accepts.
pub const WIRE_VERSION: u32 = 1;

/// Everything a worker needs to read one stage of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSpec {
    /// Free-form configuration passed through to consumers, uninterpreted.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,

    /// Filesystem path of the repository; doubles as the repositoryID cell
    /// in every emitted row.
    pub repo_path: PathBuf,

    /// Which projection of the object graph to stream.
    pub stage: Stage,

    /// Emit the stage's header (ordered field names) before the first row.
    pub has_header: bool,

    /// When non-empty, the references stream is restricted to these full
    /// reference names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_refs: Vec<String>,

    /// Restrict the commits stream to commits reachable from some
    /// reference, instead of every commit object in the store.
    #[serde(default)]
    pub reachable_only: bool,

    /// When non-empty, commits and trees are read by direct lookup of
    /// these hashes, in order, instead of a full scan.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct Wire {
    version: u32,
    #[serde(flatten)]
    spec: ShardSpec,
}

impl ShardSpec {
    /// A spec with default read options: header on, full scan.
    pub fn new(repo_path: impl Into<PathBuf>, stage: Stage) -> Self {
        Self {
            config: BTreeMap::new(),
            repo_path: repo_path.into(),
            stage,
            has_header: true,
            filter_refs: Vec::new(),
            reachable_only: false,
            hashes: Vec::new(),
        }
    }

    /// Serialize to the versioned wire form.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let wire = Wire {
            version: WIRE_VERSION,
            spec: self.clone(),
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    /// Decode a wire record produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let wire: Wire = serde_json::from_slice(bytes)?;
        if wire.version != WIRE_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                got: wire.version,
                supported: WIRE_VERSION,
            });
        }
        Ok(wire.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_minimal() {
        let spec = ShardSpec::new("/tmp/repo", Stage::Commits);
        let decoded = ShardSpec::decode(&spec.encode().unwrap()).unwrap();
        assert_eq!(decoded, spec);
    }

    #[test]
    fn test_round_trip_populated() {
        let mut spec = ShardSpec::new("/data/repos/linux", Stage::References);
        spec.config.insert("tenant".to_string(), "acme".to_string());
        spec.has_header = false;
        spec.filter_refs = vec!["refs/heads/master".to_string(), "HEAD".to_string()];
        spec.reachable_only = true;
        spec.hashes = vec!["a".repeat(40), "b".repeat(40)];

        let decoded = ShardSpec::decode(&spec.encode().unwrap()).unwrap();
        assert_eq!(decoded, spec);
    }

    #[test]
    fn test_round_trip_every_stage() {
        for stage in Stage::ALL {
            let spec = ShardSpec::new("/tmp/repo", stage);
            assert_eq!(ShardSpec::decode(&spec.encode().unwrap()).unwrap().stage, stage);
        }
    }

    #[test]
    fn test_unknown_version_rejected() {
        let raw = br#"{"version":99,"repo_path":"/r","stage":"blobs","has_header":true}"#;
        assert!(matches!(
            ShardSpec::decode(raw),
            Err(DecodeError::UnsupportedVersion { got: 99, .. })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            ShardSpec::decode(b"not json"),
            Err(DecodeError::Malformed(_))
        ));
    }
}
