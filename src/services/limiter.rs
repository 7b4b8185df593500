//! Counting semaphore bounding the number of active traversal tasks.
//!
//! The limiter only gates fan-out; it does not know which task holds a
//! permit and protects no shared data.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
pub struct ConcurrencyLimiter {
    capacity: usize,
    available: Mutex<usize>,
    released: Condvar,
    peak_in_use: AtomicUsize,
}

impl ConcurrencyLimiter {
    /// Create a limiter issuing at most `capacity` permits (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            available: Mutex::new(capacity),
            released: Condvar::new(),
            peak_in_use: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Block until a permit is free.
    pub fn acquire(&self) -> Permit<'_> {
        self.take_slot();
        Permit {
            limiter: self,
            held: true,
        }
    }

    /// Take a permit only if one is immediately free.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut available = self.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        self.note_in_use(self.capacity - *available);
        drop(available);

        Some(Permit {
            limiter: self,
            held: true,
        })
    }

    /// Every permit is currently handed out.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        *self.available.lock() == 0
    }

    #[must_use]
    pub fn in_use(&self) -> usize {
        self.capacity - *self.available.lock()
    }

    /// Highest number of permits held at once since creation.
    #[must_use]
    pub fn peak_in_use(&self) -> usize {
        self.peak_in_use.load(Ordering::Relaxed)
    }

    fn take_slot(&self) {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        self.note_in_use(self.capacity - *available);
    }

    fn give_slot(&self) {
        let mut available = self.available.lock();
        *available += 1;
        debug_assert!(*available <= self.capacity);
        drop(available);
        self.released.notify_one();
    }

    fn note_in_use(&self, in_use: usize) {
        self.peak_in_use.fetch_max(in_use, Ordering::Relaxed);
    }
}

/// A slot in the limiter, returned when dropped.
#[derive(Debug)]
pub struct Permit<'a> {
    limiter: &'a ConcurrencyLimiter,
    held: bool,
}

impl Permit<'_> {
    /// Give the slot back while the holder only waits on others.
    pub fn suspend(&mut self) {
        if self.held {
            self.held = false;
            self.limiter.give_slot();
        }
    }

    /// Re-acquire a suspended slot, blocking if none is free.
    pub fn resume(&mut self) {
        if !self.held {
            self.limiter.take_slot();
            self.held = true;
        }
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.held {
            self.limiter.give_slot();
        }
    }
}
