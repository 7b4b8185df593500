//! In-memory sink retaining records for callers that need full materialization.

use super::{RecordSink, SinkFinish};
use crate::Result;
use crate::models::NodeRecord;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<NodeRecord>,
    batches: u64,
    batch_delay: Option<Duration>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before accepting each batch, simulating a slow store.
    #[must_use]
    pub fn with_batch_delay(delay: Duration) -> Self {
        Self {
            batch_delay: Some(delay),
            ..Self::default()
        }
    }
}

impl RecordSink for MemorySink {
    fn write_batch(&mut self, batch: &[NodeRecord]) -> Result<()> {
        if let Some(delay) = self.batch_delay {
            std::thread::sleep(delay);
        }
        self.records.extend_from_slice(batch);
        self.batches = self.batches.saturating_add(1);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<SinkFinish> {
        let mut records = self.records;
        records.sort_by_key(|r| r.id);
        let persisted = records.len() as u64;
        Ok(SinkFinish::new(records, persisted, self.batches, false))
    }
}
