//! gitrows - git repositories as partitioned row streams
//!
//! This crate is a connector: it exposes the object graph of every git
//! repository under a path (references, commits, trees, blobs) as flat,
//! typed rows that a distributed tabular-dataflow engine can treat as an
//! ordinary partitioned input source.
//!
//! The source side discovers repositories, wraps each one in a serializable
//! shard spec and spreads the encoded specs round-robin across a fixed
//! number of partitions. The worker side decodes one spec at a time, opens
//! the repository and streams one stage's rows into a sink.
//!
//! # Example
//!
//! ```no_run
//! use gitrows::source::{GitSource, SourceConfig};
//! use gitrows::stage::Stage;
//! use gitrows::worker::run_local;
//!
//! let mut config = SourceConfig::new("/data/repos/**", Stage::Commits);
//! config.partitions = 4;
//! config.reachable_only = true;
//!
//! let source = GitSource::new(config).unwrap();
//! let outcomes = run_local(source.generate().unwrap());
//! for outcome in outcomes {
//!     println!("partition {}: {} rows", outcome.partition, outcome.stats.rows);
//! }
//! ```

pub mod reader;
pub mod row;
pub mod source;
pub mod stage;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use reader::{new_reader, ReadError, StageReader};
pub use row::{Row, Schema, Value};
pub use source::{GitSource, ShardSpec, SourceConfig, SourceError};
pub use stage::Stage;
pub use worker::{read_shard, run_local, RowSink, ShardError};
