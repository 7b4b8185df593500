//! Monotonic node identifier issuance shared by all traversal tasks.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct IdGenerator {
    first: u64,
    next: AtomicU64,
}

impl IdGenerator {
    /// Start issuing at `first`. Zero is reserved for the root's parent.
    pub fn new(first: u64) -> Result<Self, String> {
        if first == 0 {
            return Err("first node id must be strictly positive".to_string());
        }
        Ok(Self {
            first,
            next: AtomicU64::new(first),
        })
    }

    /// Unique, strictly increasing across all callers.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - self.first
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self {
            first: 1,
            next: AtomicU64::new(1),
        }
    }
}
