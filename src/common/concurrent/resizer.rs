use super::thread_pool;

use parking_lot::{Condvar, Mutex};
use scheduled_thread_pool::ScheduledThreadPool;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Keyed operations may run.
    Stable,
    /// A background job is rebuilding the table into one twice as long.
    Resizing,
    /// A caller is replacing the table with an empty one.
    Clearing,
}

/// Coordinates table replacements (resize and clear) with keyed operations.
///
/// Only one replacement runs at a time. While one is in flight, every keyed
/// operation parks in [`wait_until_stable`](#method.wait_until_stable) until the
/// new table has been published. The unkeyed slot never goes through here.
pub(crate) struct Resizer {
    phase: Mutex<Phase>,
    published: Condvar,
    // Mirrors `phase != Stable` so the common path does not touch the mutex.
    in_flight: AtomicBool,
    thread_pool: Arc<ScheduledThreadPool>,
}

impl Default for Resizer {
    fn default() -> Self {
        Self {
            phase: Mutex::new(Phase::Stable),
            published: Condvar::new(),
            in_flight: AtomicBool::new(false),
            thread_pool: thread_pool::resizer_pool(),
        }
    }
}

impl Resizer {
    pub(crate) fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    /// Blocks the calling thread until no resize or clear is in flight.
    ///
    /// The flag is re-checked after every wake-up, so spurious wake-ups and a new
    /// replacement that starts right after the previous one are both handled.
    pub(crate) fn wait_until_stable(&self) {
        if !self.in_flight.load(Ordering::Acquire) {
            return;
        }

        let mut phase = self.phase.lock();
        while *phase != Phase::Stable {
            self.published.wait(&mut phase);
        }
    }

    /// Flips `Stable` to `Resizing`. Returns `false` without blocking if any
    /// replacement is already in flight.
    pub(crate) fn try_begin_resize(&self) -> bool {
        let mut phase = self.phase.lock();
        if *phase != Phase::Stable {
            return false;
        }
        *phase = Phase::Resizing;
        self.in_flight.store(true, Ordering::Release);
        true
    }

    /// Takes over a resize started by `try_begin_resize`. Dropping the returned
    /// section publishes the end of the resize.
    pub(crate) fn resizing_section(&self) -> ExclusiveSection<'_> {
        debug_assert_eq!(self.phase(), Phase::Resizing);
        ExclusiveSection { resizer: self }
    }

    /// Waits for any in-flight replacement to finish, then enters `Clearing`.
    /// Dropping the returned section publishes the end of the clear.
    pub(crate) fn clearing_section(&self) -> ExclusiveSection<'_> {
        let mut phase = self.phase.lock();
        while *phase != Phase::Stable {
            self.published.wait(&mut phase);
        }
        *phase = Phase::Clearing;
        self.in_flight.store(true, Ordering::Release);
        ExclusiveSection { resizer: self }
    }

    /// Runs `job` on the shared resizer thread pool.
    pub(crate) fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.thread_pool.execute(job);
    }

    fn publish(&self) {
        let mut phase = self.phase.lock();
        *phase = Phase::Stable;
        self.in_flight.store(false, Ordering::Release);
        self.published.notify_all();
    }
}

/// Marks the thread that owns the in-flight replacement. Ends the replacement
/// and wakes every waiter when dropped, including during unwinding.
#[must_use]
pub(crate) struct ExclusiveSection<'a> {
    resizer: &'a Resizer,
}

impl Drop for ExclusiveSection<'_> {
    fn drop(&mut self) {
        self.resizer.publish();
    }
}
