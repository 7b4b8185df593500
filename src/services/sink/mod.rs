//! Persistence sinks receiving batches of completed node records.

use crate::Result;
use crate::models::NodeRecord;

/// Result returned by a sink after the record stream ends.
#[derive(Debug, Default)]
pub struct SinkFinish {
    /// Records retained in memory (only populated by `MemorySink`)
    pub records: Vec<NodeRecord>,
    pub persisted: u64,
    pub batches: u64,
    /// Whether a lookup index on `parent_id` was built
    pub index_built: bool,
}

impl SinkFinish {
    #[must_use]
    pub fn new(records: Vec<NodeRecord>, persisted: u64, batches: u64, index_built: bool) -> Self {
        Self {
            records,
            persisted,
            batches,
            index_built,
        }
    }
}

/// Trait implemented by sinks that durably store node records.
pub trait RecordSink: Send {
    /// Store one batch atomically: either every record lands or none does.
    fn write_batch(&mut self, batch: &[NodeRecord]) -> Result<()>;

    /// Called once after the final batch; builds lookup structures.
    fn finish(self: Box<Self>) -> Result<SinkFinish>;
}

pub mod memory;
pub mod parquet;
pub mod sqlite;

pub use memory::MemorySink;
pub use parquet::ParquetSink;
pub use sqlite::SqliteSink;
