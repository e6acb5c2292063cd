//! Local disk budget shared by all segment workers of one upload.
//!
//! Workers acquire one unit before creating a local segment file and release
//! it after the file has been deleted, so at most `capacity` segment files
//! exist on disk at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

use crate::error::SegmentError;

/// Concurrency derived from the requested worker count and the disk ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskBudget {
    pub requested_concurrency: usize,
    pub max_concurrent_segments: usize,
}

impl DiskBudget {
    /// `min(requested, floor(max_disk_space / segment_size), segment_count)`, never below 1.
    /// Without a disk ceiling only the request and segment count bound it.
    pub fn derive(
        requested_concurrency: usize,
        max_disk_space: Option<u64>,
        segment_size: u64,
        segment_count: usize,
    ) -> Self {
        let mut effective = requested_concurrency.min(segment_count);
        if let Some(max_disk) = max_disk_space {
            let fits = max_disk.checked_div(segment_size).unwrap_or(u64::MAX);
            let fits = usize::try_from(fits).unwrap_or(usize::MAX);
            effective = effective.min(fits);
        }
        Self {
            requested_concurrency,
            max_concurrent_segments: effective.max(1),
        }
    }

    /// True when the disk ceiling forced fewer workers than requested.
    pub fn is_disk_limited(&self, segment_count: usize) -> bool {
        self.max_concurrent_segments < self.requested_concurrency.min(segment_count).max(1)
    }
}

/// Blocking counting gate over local segment files.
#[derive(Debug)]
pub struct DiskBudgetGate {
    capacity: usize,
    in_use: Mutex<usize>,
    released: Condvar,
    high_water: AtomicUsize,
}

impl DiskBudgetGate {
    /// Create a gate with `capacity` units (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            in_use: Mutex::new(0),
            released: Condvar::new(),
            high_water: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Units currently held.
    pub fn in_use(&self) -> usize {
        *self.lock()
    }

    /// Largest number of units ever held at once.
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::Relaxed)
    }

    /// Block until a unit is free, then take it. The returned permit releases the unit on drop.
    pub fn acquire(&self) -> Result<GatePermit<'_>, SegmentError> {
        let mut in_use = self.lock();
        while *in_use >= self.capacity {
            in_use = self
                .released
                .wait(in_use)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        *in_use += 1;
        if *in_use > self.capacity {
            let held = *in_use;
            *in_use -= 1;
            return Err(SegmentError::BudgetExhausted {
                in_use: held,
                capacity: self.capacity,
            });
        }
        self.high_water.fetch_max(*in_use, Ordering::Relaxed);
        Ok(GatePermit { gate: self })
    }

    fn release(&self) {
        let mut in_use = self.lock();
        *in_use = in_use.saturating_sub(1);
        drop(in_use);
        self.released.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // The counter stays consistent even if a holder panicked.
        self.in_use
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One unit of the disk budget. Released when dropped.
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a DiskBudgetGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
