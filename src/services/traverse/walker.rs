//! Per-node visit logic and the async/sync recursion split.

use super::{AsyncPolicy, SkipReason, WalkStats};
use crate::models::{NodeRecord, ROOT_PARENT_ID};
use crate::services::ids::IdGenerator;
use crate::services::limiter::{ConcurrencyLimiter, Permit};
use crate::services::monitor::ActiveTasks;
use crate::services::pipeline::RecordSender;
use crate::{Error, Result, ScanOptions};
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// State shared by every traversal task of one scan.
///
/// Dropping the context drops its record sender, which is what tells the
/// drain side that no more records will arrive.
pub struct WalkContext {
    options: ScanOptions,
    limiter: ConcurrencyLimiter,
    ids: IdGenerator,
    sender: RecordSender,
    tasks: Arc<ActiveTasks>,
    stats: WalkStats,
    emitted: AtomicU64,
}

impl WalkContext {
    pub fn new(options: &ScanOptions, sender: RecordSender, tasks: Arc<ActiveTasks>) -> Result<Self> {
        let ids = IdGenerator::new(options.first_id).map_err(Error::InvalidInput)?;
        Ok(Self {
            options: options.clone(),
            limiter: ConcurrencyLimiter::new(options.concurrency),
            ids,
            sender,
            tasks,
            stats: WalkStats::default(),
            emitted: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    #[must_use]
    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }

    /// Identifiers handed out so far.
    #[must_use]
    pub fn ids_issued(&self) -> u64 {
        self.ids.issued()
    }

    /// Records the pipeline accepted. Lower than `ids_issued` once the
    /// drain side has stopped early.
    #[must_use]
    pub fn records_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Walk `root` at depth 0 with no parent. Returns the root's record, or
    /// `None` when the root itself could not be examined.
    pub fn walk_root(&self, root: &Path) -> Option<NodeRecord> {
        log::debug!(
            "Walking {} (concurrency {}, async depth {}, policy {})",
            root.display(),
            self.limiter.capacity(),
            self.options.async_depth,
            self.options.async_policy
        );
        self.walk_task(root, ROOT_PARENT_ID, 0)
    }

    /// One traversal task: holds a limiter permit for as long as it does
    /// filesystem work.
    fn walk_task(&self, path: &Path, parent_id: u64, depth: usize) -> Option<NodeRecord> {
        let _task = self.tasks.enter();
        let mut permit = self.limiter.acquire();
        self.visit(path, parent_id, depth, Some(&mut permit))
    }

    /// Examine one entry. `permit` is `Some` only for tasks that may still
    /// fan out; once `None`, the whole subtree is processed in place.
    fn visit(
        &self,
        path: &Path,
        parent_id: u64,
        depth: usize,
        permit: Option<&mut Permit<'_>>,
    ) -> Option<NodeRecord> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("Path not found: {}", path.display());
                self.stats.record(SkipReason::NotFound);
                return None;
            }
            Err(e) => {
                log::warn!("Cannot stat {}: {e}", path.display());
                self.stats.record(SkipReason::StatError);
                return None;
            }
        };

        let file_type = metadata.file_type();
        if file_type.is_file() {
            let size = self.options.size_basis.size_of(&metadata);
            let class = self.options.size_classes.classify(size);
            let record = NodeRecord::file(self.ids.next(), parent_id, normalize_path(path), size, class);
            log::trace!("File {} ({size} bytes, class {})", record.path, class.label());
            self.emit(&record);
            Some(record)
        } else if file_type.is_symlink() {
            let target = match fs::read_link(path) {
                Ok(t) => normalize_path(&t),
                Err(e) => {
                    log::warn!("Cannot read symlink target of {}: {e}", path.display());
                    self.stats.record(SkipReason::UnreadableSymlinkTarget);
                    String::new()
                }
            };
            let record = NodeRecord::symlink(self.ids.next(), parent_id, normalize_path(path), target);
            self.emit(&record);
            Some(record)
        } else if file_type.is_dir() {
            Some(self.visit_directory(path, parent_id, depth, &metadata, permit))
        } else {
            log::warn!("Unsupported file type at {}, skipping", path.display());
            self.stats.record(SkipReason::UnsupportedType);
            None
        }
    }

    fn visit_directory(
        &self,
        path: &Path,
        parent_id: u64,
        depth: usize,
        metadata: &fs::Metadata,
        permit: Option<&mut Permit<'_>>,
    ) -> NodeRecord {
        let children = self.list_children(path);
        let mut record = NodeRecord::directory(
            self.ids.next(),
            parent_id,
            normalize_path(path),
            self.options.size_basis.size_of(metadata),
            self.options.count_directory_size,
        );
        let id = record.id;
        let count_symlink_size = self.options.count_symlink_size;

        match permit {
            Some(permit) if !children.is_empty() && self.should_fan_out(depth) => {
                // The permit goes back while this task only waits on its
                // children, so a waiting parent never starves them.
                permit.suspend();
                let results: Vec<Option<NodeRecord>> = children
                    .par_iter()
                    .map(|child| self.walk_task(child, id, depth + 1))
                    .collect();
                permit.resume();

                for child in &results {
                    record.absorb_child(child.as_ref(), count_symlink_size);
                }
            }
            _ => {
                for child in &children {
                    let result = self.visit(child, id, depth + 1, None);
                    record.absorb_child(result.as_ref(), count_symlink_size);
                }
            }
        }

        log::debug!(
            "Directory {} (size: {}, files: {}, symlinks: {}, depth: {depth})",
            record.path,
            record.totals.total_size,
            record.totals.file_count,
            record.totals.symlink_count
        );
        self.emit(&record);
        record
    }

    fn should_fan_out(&self, depth: usize) -> bool {
        if depth >= self.options.async_depth {
            return false;
        }
        match self.options.async_policy {
            AsyncPolicy::DepthBudget => true,
            AsyncPolicy::Saturation => !self.limiter.is_saturated(),
        }
    }

    /// Child paths sorted by name. Unlistable directories have no children.
    fn list_children(&self, path: &Path) -> Vec<PathBuf> {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot list {}: {e}", path.display());
                self.stats.record(SkipReason::ListError);
                return Vec::new();
            }
        };

        let mut children = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => children.push(entry.path()),
                Err(e) => {
                    log::warn!("Cannot read an entry of {}: {e}", path.display());
                    self.stats.record(SkipReason::ListError);
                }
            }
        }
        children.sort();
        children
    }

    fn emit(&self, record: &NodeRecord) {
        if self.sender.emit(record.clone()) {
            self.emitted.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Normalize path for storage
#[cfg(windows)]
#[must_use]
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(not(windows))]
#[must_use]
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
