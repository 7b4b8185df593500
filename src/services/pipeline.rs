//! Bounded record pipeline between traversal tasks and the persistence sink.
//!
//! Every completed record is pushed exactly once. A full channel blocks the
//! producing task, which bounds memory when the sink is slower than the walk.
//! The drain side applies the skip policy, batches records and hands them to
//! the sink; closing every sender is the stop signal.

use crate::models::{NodeKind, NodeRecord};
use crate::services::monitor::MemoryProbe;
use crate::services::progress::Checkpointer;
use crate::services::sink::RecordSink;
use crate::{Error, Result};
use crossbeam_channel::{Receiver, Sender, bounded};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Default floor for the small-file skip policy (200 MiB).
pub const DEFAULT_SKIP_FLOOR: u64 = 200 * 1024 * 1024;

/// Decides per record, at drain time, whether the sink stores it.
/// Directories and symlinks are always stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipPolicy {
    KeepAll,
    /// Skip regular files whose size is at or below the floor
    SkipAtOrBelow(u64),
    /// Skip regular files larger than the ceiling
    SkipAbove(u64),
}

impl Default for SkipPolicy {
    fn default() -> Self {
        SkipPolicy::SkipAtOrBelow(DEFAULT_SKIP_FLOOR)
    }
}

impl SkipPolicy {
    #[must_use]
    pub fn skips(&self, record: &NodeRecord) -> bool {
        if record.kind != NodeKind::File {
            return false;
        }
        match *self {
            SkipPolicy::KeepAll => false,
            SkipPolicy::SkipAtOrBelow(floor) => record.self_size <= floor,
            SkipPolicy::SkipAbove(ceiling) => record.self_size > ceiling,
        }
    }
}

/// Create a pipeline holding at most `capacity` records in flight.
#[must_use]
pub fn bounded_pipeline(capacity: usize) -> (RecordSender, RecordReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let sender = RecordSender {
        inner: tx,
        closed_reported: Arc::new(AtomicBool::new(false)),
    };
    (sender, RecordReceiver { inner: rx })
}

#[derive(Debug, Clone)]
pub struct RecordSender {
    inner: Sender<NodeRecord>,
    closed_reported: Arc<AtomicBool>,
}

impl RecordSender {
    /// Push a completed record, blocking while the pipeline is full.
    /// Returns false when the drain side has already stopped.
    pub fn emit(&self, record: NodeRecord) -> bool {
        match self.inner.send(record) {
            Ok(()) => true,
            Err(err) => {
                if !self.closed_reported.swap(true, Ordering::Relaxed) {
                    log::error!(
                        "Record pipeline closed; dropping {} and later records",
                        err.0.path
                    );
                }
                false
            }
        }
    }
}

#[derive(Debug)]
pub struct RecordReceiver {
    inner: Receiver<NodeRecord>,
}

impl RecordReceiver {
    /// Records currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Block for the next record; `None` once every sender is gone and the
    /// queue is empty.
    pub fn recv(&self) -> Option<NodeRecord> {
        self.inner.recv().ok()
    }
}

/// Settings for the drain loop.
#[derive(Debug, Clone)]
pub struct DrainConfig {
    pub batch_size: usize,
    pub skip_policy: SkipPolicy,
    pub logging_interval: u64,
    pub started: Instant,
}

/// Totals reported once the drain loop has flushed and stopped.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DrainReport {
    pub records_received: u64,
    pub records_skipped: u64,
    pub records_persisted: u64,
    pub bytes_scanned: u64,
    pub batches: u64,
    pub index_built: bool,
    /// Records retained by an in-memory sink
    #[serde(skip)]
    pub records: Vec<NodeRecord>,
}

/// Drain the pipeline into `sink` until every sender is dropped.
///
/// A failed batch is fatal: the loop stops immediately, which closes the
/// receiving side.
pub fn drain(
    receiver: RecordReceiver,
    mut sink: Box<dyn RecordSink>,
    config: &DrainConfig,
) -> Result<DrainReport> {
    let batch_size = config.batch_size.max(1);
    let mut batch: Vec<NodeRecord> = Vec::with_capacity(batch_size);
    let mut report = DrainReport::default();
    let mut checkpointer = Checkpointer::new(config.logging_interval, config.started);
    let mut memory = MemoryProbe::new();

    while let Some(record) = receiver.recv() {
        report.records_received += 1;
        if record.kind == NodeKind::File {
            report.bytes_scanned = report.bytes_scanned.saturating_add(record.self_size);
        }

        if let Some(checkpoint) =
            checkpointer.consider(Instant::now(), report.records_received, report.bytes_scanned)
        {
            checkpoint.log(&record.path, receiver.len(), memory.sample());
        }

        if config.skip_policy.skips(&record) {
            report.records_skipped += 1;
            continue;
        }

        batch.push(record);
        if batch.len() == batch_size {
            write_batch(sink.as_mut(), &mut batch)?;
        }
    }

    log::debug!("Pipeline closed; flushing {} buffered records", batch.len());
    write_batch(sink.as_mut(), &mut batch)?;

    let finish = sink.finish()?;
    report.records_persisted = finish.persisted;
    report.batches = finish.batches;
    report.index_built = finish.index_built;
    report.records = finish.records;
    Ok(report)
}

fn write_batch(sink: &mut dyn RecordSink, batch: &mut Vec<NodeRecord>) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    sink.write_batch(batch).map_err(|err| {
        log::error!("Batch of {} records rejected: {err}", batch.len());
        match err {
            Error::Persistence(_) => err,
            other => Error::Persistence(other.to_string()),
        }
    })?;
    batch.clear();
    Ok(())
}

/// Run `drain` on a dedicated thread.
pub fn spawn_drain(
    receiver: RecordReceiver,
    sink: Box<dyn RecordSink>,
    config: DrainConfig,
) -> Result<JoinHandle<Result<DrainReport>>> {
    thread::Builder::new()
        .name("fsstat-drain".into())
        .spawn(move || drain(receiver, sink, &config))
        .map_err(|e| Error::System(format!("cannot spawn drain thread: {e}")))
}
