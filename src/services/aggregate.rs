//! Rollup of completed child records into their parent directory

use crate::models::{NodeKind, NodeRecord, SizeHistogram, Totals};

impl Totals {
    /// What a completed child adds to its parent's aggregates.
    ///
    /// A file counts as one file and carries its own size class; a symlink
    /// counts as one symlink and contributes its size only when
    /// `count_symlink_size` is set; a directory contributes its aggregates.
    #[must_use]
    pub fn contribution_of(record: &NodeRecord, count_symlink_size: bool) -> Totals {
        match record.kind {
            NodeKind::File => Totals {
                total_size: record.self_size,
                file_count: 1,
                symlink_count: 0,
                histogram: record.totals.histogram,
            },
            NodeKind::Symlink => Totals {
                total_size: if count_symlink_size {
                    record.self_size
                } else {
                    0
                },
                file_count: 0,
                symlink_count: 1,
                histogram: SizeHistogram::default(),
            },
            NodeKind::Directory => record.totals,
        }
    }

    /// Elementwise summation; commutative and associative.
    pub fn absorb(&mut self, other: &Totals) {
        self.total_size = self.total_size.saturating_add(other.total_size);
        self.file_count = self.file_count.saturating_add(other.file_count);
        self.symlink_count = self.symlink_count.saturating_add(other.symlink_count);
        self.histogram.merge(&other.histogram);
    }
}

impl NodeRecord {
    /// Merge one child's result into this directory. Missing children
    /// contribute nothing.
    pub fn absorb_child(&mut self, child: Option<&NodeRecord>, count_symlink_size: bool) {
        debug_assert!(self.is_dir(), "only directories aggregate children");
        if let Some(child) = child {
            let contribution = Totals::contribution_of(child, count_symlink_size);
            self.totals.absorb(&contribution);
        }
    }
}

/// Records whose `parent_id` is `parent_id`.
#[must_use]
pub fn immediate_children(all: &[NodeRecord], parent_id: u64) -> Vec<&NodeRecord> {
    all.iter().filter(|r| r.parent_id == parent_id).collect()
}
