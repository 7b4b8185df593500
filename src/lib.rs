//! Concurrent Filesystem Statistics Library
//!
//! This library walks a directory tree with bounded parallelism, rolls file
//! sizes, counts and size-class histograms up into every directory, and
//! streams one record per visited entry through a bounded pipeline into a
//! persistence sink (SQLite, Parquet or memory).

pub mod cli;
pub mod io;
pub mod models;
pub mod services;

pub use models::{NodeKind, NodeRecord, ResourceUsage, SizeClass, SizeClassTable};
pub use services::pipeline::{DrainReport, SkipPolicy};
pub use services::size::SizeBasis;
pub use services::traverse::{AsyncPolicy, WalkSummary};

use services::monitor::{ActiveTasks, ResourceMonitor};
use services::pipeline::{DrainConfig, bounded_pipeline, spawn_drain};
use services::sink::RecordSink;
use services::traverse::{WalkContext, normalize_path};
use std::path::Path;
use std::result;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Stack size of traversal worker threads. Sync recursion runs on these
/// stacks, so deep trees need more than rayon's default.
const WALK_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Custom error type for the library
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    InvalidInput(String),
    /// A batch write or index build failed; the scan's output is incomplete
    Persistence(String),
    Sink(String),
    /// The user declined to overwrite existing output
    Aborted,
    System(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Error::Persistence(msg) => write!(f, "Persistence error: {msg}"),
            Error::Sink(msg) => write!(f, "Sink error: {msg}"),
            Error::Aborted => write!(f, "Aborted by user"),
            Error::System(msg) => write!(f, "System error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Persistence(format!("SQLite: {err}"))
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Options for scanning a directory tree
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum number of traversal tasks doing filesystem work at once
    pub concurrency: usize,
    /// Pipeline capacity, also the sink batch size
    pub buffer_size: usize,
    /// Directories shallower than this fan their children out
    pub async_depth: usize,
    pub async_policy: AsyncPolicy,
    pub skip_policy: SkipPolicy,
    /// Log a progress checkpoint every N drained records
    pub logging_interval: u64,
    pub size_basis: SizeBasis,
    pub size_classes: SizeClassTable,
    pub count_directory_size: bool,
    pub count_symlink_size: bool,
    pub monitor_interval: Duration,
    pub first_id: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 128,
            buffer_size: 256,
            async_depth: 5,
            async_policy: AsyncPolicy::DepthBudget,
            skip_policy: SkipPolicy::default(),
            logging_interval: 5000,
            size_basis: SizeBasis::Logical,
            size_classes: SizeClassTable::default(),
            count_directory_size: false,
            count_symlink_size: false,
            monitor_interval: Duration::from_millis(10),
            first_id: 1,
        }
    }
}

impl ScanOptions {
    /// Reject settings the scan cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.size_classes.check().map_err(Error::InvalidInput)?;

        let problem = if self.concurrency == 0 {
            Some("concurrency must be at least 1")
        } else if self.buffer_size == 0 {
            Some("buffer size must be at least 1")
        } else if self.logging_interval == 0 {
            Some("logging interval must be at least 1")
        } else if self.first_id == 0 {
            Some("identifiers must start above 0")
        } else if self.monitor_interval.is_zero() {
            Some("monitor interval must be positive")
        } else {
            None
        };

        match problem {
            Some(msg) => Err(Error::InvalidInput(msg.to_string())),
            None => Ok(()),
        }
    }
}

/// Lifecycle of one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// Traversal tasks are producing records
    Running,
    /// The root returned; the pipeline is closed and the drain is flushing
    Draining,
    Stopped,
}

impl ShutdownState {
    fn advance(&mut self, next: ShutdownState) {
        log::debug!("Scan state: {self:?} -> {next:?}");
        *self = next;
    }
}

/// Everything known once a scan has stopped
#[derive(Debug)]
pub struct ScanReport {
    pub root: String,
    /// `None` when the root itself could not be examined
    pub root_record: Option<NodeRecord>,
    pub drain: DrainReport,
    pub resources: ResourceUsage,
    pub walk: WalkSummary,
    /// Highest number of limiter permits held at once
    pub peak_permits: usize,
    /// Records accepted by the pipeline
    pub records_emitted: u64,
    pub state: ShutdownState,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

/// Scan `root` and stream its records into `sink`.
///
/// Returns after the walk has finished, the pipeline has been drained and the
/// sink has been finished. A persistence failure is reported as the scan's
/// error once every traversal task has returned.
pub fn scan<P: AsRef<Path>>(
    root: P,
    opts: &ScanOptions,
    sink: Box<dyn RecordSink>,
) -> Result<ScanReport> {
    opts.validate()?;

    let root = std::path::absolute(root.as_ref())?;
    let root_display = normalize_path(&root);
    if let Err(e) = std::fs::symlink_metadata(&root) {
        return Err(if e.kind() == std::io::ErrorKind::NotFound {
            Error::InvalidInput(format!("Path does not exist: {root_display}"))
        } else {
            Error::Io(e)
        });
    }

    let started_at = SystemTime::now();
    let started = Instant::now();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.concurrency)
        .thread_name(|i| format!("fsstat-walk-{i}"))
        .stack_size(WALK_STACK_SIZE)
        .build()
        .map_err(|e| Error::System(format!("cannot build traversal pool: {e}")))?;

    let tasks = Arc::new(ActiveTasks::new());
    let (sender, receiver) = bounded_pipeline(opts.buffer_size);
    let context = WalkContext::new(opts, sender, Arc::clone(&tasks))?;

    let drain = spawn_drain(
        receiver,
        sink,
        DrainConfig {
            batch_size: opts.buffer_size,
            skip_policy: opts.skip_policy,
            logging_interval: opts.logging_interval,
            started,
        },
    )?;
    let monitor = ResourceMonitor::start(opts.monitor_interval, tasks)?;

    let mut state = ShutdownState::Running;
    log::info!("Scanning {root_display}");
    let root_record = pool.install(|| context.walk_root(&root));

    let peak_permits = context.limiter().peak_in_use();
    let walk = context.stats().snapshot();
    let records_emitted = context.records_emitted();
    // The context owns the last sender; dropping it closes the pipeline.
    drop(context);
    state.advance(ShutdownState::Draining);

    let resources = monitor.stop();
    let drain = drain
        .join()
        .map_err(|_| Error::System("drain thread panicked".to_string()))??;
    state.advance(ShutdownState::Stopped);

    if walk.total() > 0 {
        log::warn!("{} entries were skipped or degraded during the walk", walk.total());
    }
    log::info!(
        "Scan finished: {} records received, {} persisted in {} ms",
        drain.records_received,
        drain.records_persisted,
        resources.duration_ms
    );

    Ok(ScanReport {
        root: root_display,
        root_record,
        drain,
        resources,
        walk,
        peak_permits,
        records_emitted,
        state,
        started_at,
        finished_at: SystemTime::now(),
    })
}
