//! Progress checkpoints emitted by the drain loop every N records.

use crate::services::format::format_size;
use std::time::{Duration, Instant};

/// Counters captured at one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub records: u64,
    pub bytes: u64,
    pub elapsed: Duration,
    pub current_bytes_per_sec: Option<u64>,
    pub average_bytes_per_sec: Option<u64>,
}

impl Checkpoint {
    /// Write the checkpoint to the log at `info` level.
    pub fn log(&self, current_node: &str, queued: usize, memory_bytes: Option<u64>) {
        let speed = |rate: Option<u64>| rate.map_or_else(|| "n/a".to_string(), format_size);

        log::info!("===== Checkpoint =====");
        log::info!("Data in queue: {queued}");
        if let Some(memory) = memory_bytes {
            log::info!("Memory used: {}", format_size(memory));
        }
        log::info!("Current file node: {current_node}");
        log::info!("File nodes scanned: {}", self.records);
        log::info!("Size scanned: {}", format_size(self.bytes));
        log::info!("Time elapsed: {:?}", self.elapsed);
        log::info!("Current speed: {}/s", speed(self.current_bytes_per_sec));
        log::info!("Average speed: {}/s", speed(self.average_bytes_per_sec));
    }
}

/// Count-based throttler deciding when a checkpoint is due.
#[derive(Debug)]
pub struct Checkpointer {
    interval: u64,
    started: Instant,
    last_emit: Instant,
    last_emit_bytes: u64,
}

impl Checkpointer {
    /// Emit every `interval` records (minimum one).
    #[must_use]
    pub fn new(interval: u64, started: Instant) -> Self {
        Self {
            interval: interval.max(1),
            started,
            last_emit: started,
            last_emit_bytes: 0,
        }
    }

    /// Consider a checkpoint after `records` records totalling `bytes`.
    pub fn consider(&mut self, now: Instant, records: u64, bytes: u64) -> Option<Checkpoint> {
        if records == 0 || records % self.interval != 0 {
            return None;
        }

        let since_last = now.saturating_duration_since(self.last_emit);
        let elapsed = now.saturating_duration_since(self.started);
        let checkpoint = Checkpoint {
            records,
            bytes,
            elapsed,
            current_bytes_per_sec: compute_throughput(
                bytes.saturating_sub(self.last_emit_bytes),
                since_last,
            ),
            average_bytes_per_sec: compute_throughput(bytes, elapsed),
        };

        self.last_emit = now;
        self.last_emit_bytes = bytes;
        Some(checkpoint)
    }
}

fn compute_throughput(bytes_delta: u64, elapsed: Duration) -> Option<u64> {
    let nanos = elapsed.as_nanos();
    if nanos == 0 {
        return None;
    }

    let numerator = u128::from(bytes_delta) * 1_000_000_000u128;
    let rate = numerator / nanos;
    u64::try_from(rate.min(u128::from(u64::MAX))).ok()
}
