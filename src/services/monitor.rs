//! Resource monitor sampling process memory and live traversal tasks.
//!
//! Observational only: nothing in the walk or the drain reads its results.

use crate::models::ResourceUsage;
use crate::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};

/// Explicit count of traversal tasks currently alive.
#[derive(Debug, Default)]
pub struct ActiveTasks {
    current: AtomicU64,
    peak: AtomicU64,
}

impl ActiveTasks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task; it is counted until the guard drops.
    pub fn enter(&self) -> TaskGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak.fetch_max(now, Ordering::Relaxed);
        TaskGuard { tasks: self }
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn peak(&self) -> u64 {
        self.peak.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct TaskGuard<'a> {
    tasks: &'a ActiveTasks,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.tasks.current.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Resident memory of the current process.
pub struct MemoryProbe {
    system: System,
    pid: Option<Pid>,
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe {
    #[must_use]
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| log::debug!("Process memory unavailable: {e}"))
            .ok();
        Self {
            system: System::new(),
            pid,
        }
    }

    pub fn sample(&mut self) -> Option<u64> {
        let pid = self.pid?;
        if !self.system.refresh_process(pid) {
            return None;
        }
        self.system.process(pid).map(sysinfo::Process::memory)
    }
}

/// Background sampler started before the walk and stopped after it.
pub struct ResourceMonitor {
    stop: Sender<()>,
    handle: JoinHandle<ResourceUsage>,
}

impl ResourceMonitor {
    /// Spawn the sampler thread.
    pub fn start(interval: Duration, tasks: Arc<ActiveTasks>) -> Result<Self> {
        let (stop, stopped) = bounded(1);
        let handle = thread::Builder::new()
            .name("fsstat-monitor".into())
            .spawn(move || sample_until_stopped(interval, &tasks, &stopped))
            .map_err(|e| Error::System(format!("cannot spawn monitor thread: {e}")))?;

        Ok(Self { stop, handle })
    }

    /// Signal the sampler, wait for it, and return the peaks it observed.
    pub fn stop(self) -> ResourceUsage {
        let _ = self.stop.send(());
        self.handle.join().unwrap_or_else(|_| {
            log::warn!("Resource monitor thread panicked; usage unavailable");
            ResourceUsage::default()
        })
    }
}

fn sample_until_stopped(
    interval: Duration,
    tasks: &ActiveTasks,
    stopped: &Receiver<()>,
) -> ResourceUsage {
    let started = Instant::now();
    let mut probe = MemoryProbe::new();
    let mut usage = ResourceUsage::default();

    loop {
        if let Some(memory) = probe.sample() {
            usage.peak_memory_bytes = usage.peak_memory_bytes.max(memory);
        }
        usage.peak_active_tasks = usage.peak_active_tasks.max(tasks.current());

        match stopped.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    usage.peak_active_tasks = usage.peak_active_tasks.max(tasks.peak());
    usage.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    log::debug!("Resource monitor stopped after {} ms", usage.duration_ms);
    usage
}
