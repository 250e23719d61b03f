//! Worker side of the connector.
//!
//! A worker receives encoded work units, decodes each one, opens its own
//! handle to the repository's object store, builds the stage reader and
//! pumps rows into a sink until end of stream. Workers share no mutable
//! state; each shard decode gets a fresh repository handle, and a failed
//! shard is reported and abandoned while the worker moves on to its next
//! one. Retry, if wanted, belongs to the host engine.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::Repository;
use parking_lot::Mutex;
use thiserror::Error;

use crate::reader::{fetch_content, new_reader, ReadError};
use crate::row::Row;
use crate::source::{DecodeError, ShardSpec, WorkUnit};

/// A failure confined to one shard.
#[derive(Debug, Error)]
pub enum ShardError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("could not open repository {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("could not write row: {0}")]
    Sink(#[from] io::Error),
}

/// Where a worker writes its rows.
pub trait RowSink {
    /// Called once per shard, before any row, when the shard asks for a
    /// header. The default ignores it.
    fn write_header(&mut self, fields: &[&'static str]) -> io::Result<()> {
        let _ = fields;
        Ok(())
    }

    fn write_row(&mut self, row: Row) -> io::Result<()>;
}

/// What one shard produced, threaded back to the caller explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardStats {
    pub rows: u64,
}

/// Decode one work unit and stream its rows into the sink.
pub fn read_shard(unit: &WorkUnit, sink: &mut dyn RowSink) -> Result<ShardStats, ShardError> {
    let spec = ShardSpec::decode(unit)?;
    read_spec(&spec, sink)
}

/// Stream one already-decoded shard into the sink.
pub fn read_spec(spec: &ShardSpec, sink: &mut dyn RowSink) -> Result<ShardStats, ShardError> {
    log::info!("reading {} from {}", spec.stage, spec.repo_path.display());

    let repo = open_repository(&spec.repo_path)?;
    let mut reader = new_reader(&repo, spec)?;

    if spec.has_header {
        sink.write_header(&reader.header())?;
    }

    let mut stats = ShardStats::default();
    while let Some(row) = reader.read()? {
        sink.write_row(row)?;
        stats.rows += 1;
    }

    log::debug!(
        "{} rows from {} stage of {}",
        stats.rows,
        spec.stage,
        spec.repo_path.display()
    );
    Ok(stats)
}

fn open_repository(path: &Path) -> Result<Repository, ShardError> {
    Repository::open(path).map_err(|source| ShardError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// On-demand blob content for a downstream step.
///
/// Empty and all-zero hashes return no bytes without touching the
/// repository at all.
pub fn fetch_blob(repo_path: &Path, hash: &str) -> Result<Vec<u8>, ShardError> {
    if hash.is_empty() {
        return Ok(Vec::new());
    }
    let repo = open_repository(repo_path)?;
    Ok(fetch_content(&repo, repo_path, hash)?)
}

/// A sink that accumulates rows in memory.
///
/// Clones share the same storage, so a caller can keep a handle while a
/// worker writes through another.
#[derive(Clone, Default)]
pub struct CollectSink {
    header: Arc<Mutex<Option<Vec<&'static str>>>>,
    rows: Arc<Mutex<Vec<Row>>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The header written by the first shard that carried one.
    pub fn header(&self) -> Option<Vec<&'static str>> {
        self.header.lock().clone()
    }

    /// Snapshot of the rows collected so far.
    pub fn rows(&self) -> Vec<Row> {
        self.rows.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

impl RowSink for CollectSink {
    fn write_header(&mut self, fields: &[&'static str]) -> io::Result<()> {
        self.header.lock().get_or_insert_with(|| fields.to_vec());
        Ok(())
    }

    fn write_row(&mut self, row: Row) -> io::Result<()> {
        self.rows.lock().push(row);
        Ok(())
    }
}

/// A sink that writes tab-separated rows to any writer.
///
/// The header is written at most once even when every shard of a stream
/// carries one.
pub struct TsvSink<W: Write> {
    out: W,
    wrote_header: bool,
}

impl<W: Write> TsvSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            wrote_header: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RowSink for TsvSink<W> {
    fn write_header(&mut self, fields: &[&'static str]) -> io::Result<()> {
        if self.wrote_header {
            return Ok(());
        }
        self.wrote_header = true;
        writeln!(self.out, "{}", fields.join("\t"))
    }

    fn write_row(&mut self, row: Row) -> io::Result<()> {
        let mut first = true;
        for cell in row.cells() {
            if !first {
                write!(self.out, "\t")?;
            }
            first = false;
            write!(self.out, "{}", cell)?;
        }
        writeln!(self.out)
    }
}

/// What one partition's worker produced.
#[derive(Debug)]
pub struct PartitionOutcome {
    pub partition: usize,
    pub rows: Vec<Row>,
    pub stats: ShardStats,
    /// Shards that failed; their streams ended early but the worker kept
    /// going with its remaining shards.
    pub failures: Vec<ShardError>,
}

/// Process every partition locally, one worker thread per partition.
///
/// Each worker owns its work units, sink and repository handles outright;
/// the threads share nothing mutable.
pub fn run_local(partitions: Vec<Vec<WorkUnit>>) -> Vec<PartitionOutcome> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = partitions
            .into_iter()
            .enumerate()
            .map(|(partition, units)| {
                scope.spawn(move || {
                    let sink = CollectSink::new();
                    let mut stats = ShardStats::default();
                    let mut failures = Vec::new();

                    for unit in &units {
                        let mut writer = sink.clone();
                        match read_shard(unit, &mut writer) {
                            Ok(shard) => stats.rows += shard.rows,
                            Err(err) => {
                                log::error!("partition {}: shard failed: {}", partition, err);
                                failures.push(err);
                            }
                        }
                    }

                    PartitionOutcome {
                        partition,
                        rows: sink.rows(),
                        stats,
                        failures,
                    }
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread panicked"))
            .collect()
    })
}
