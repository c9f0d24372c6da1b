//! Fork-aware, lazily constructed process-local values.
//!
//! A [`ProcessLocal`] holds one value per operating-system process. The
//! process id is recorded when the value is built; a lookup from a process
//! with a different id (a forked child) discards the inherited value and
//! builds a fresh one, so network clients and file descriptors are never
//! shared across a fork.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

type PidSource = Arc<dyn Fn() -> u32 + Send + Sync>;

struct Slot<T> {
    pid: u32,
    value: Arc<T>,
}

/// A lazily built value valid only inside the process that built it.
pub struct ProcessLocal<T> {
    slot: RwLock<Option<Slot<T>>>,
    pid: PidSource,
}

impl<T> fmt::Debug for ProcessLocal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessLocal")
            .field("cached_pid", &self.cached_pid())
            .finish()
    }
}

impl<T> Default for ProcessLocal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ProcessLocal<T> {
    /// Create an empty cache keyed on [`std::process::id`].
    pub fn new() -> Self {
        Self::with_pid_source(std::process::id)
    }

    /// Create an empty cache with a custom process id source.
    pub fn with_pid_source(pid: impl Fn() -> u32 + Send + Sync + 'static) -> Self {
        Self {
            slot: RwLock::new(None),
            pid: Arc::new(pid),
        }
    }

    /// Process id the cached value was built in, if any.
    pub fn cached_pid(&self) -> Option<u32> {
        self.slot.read().as_ref().map(|s| s.pid)
    }

    /// Return the value for the current process, building it if needed.
    ///
    /// The write lock is held while `init` runs, so concurrent callers in
    /// one process build at most once. A failed `init` leaves the slot
    /// untouched.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        let pid = (self.pid)();

        if let Some(slot) = self.slot.read().as_ref() {
            if slot.pid == pid {
                return Ok(Arc::clone(&slot.value));
            }
        }

        let mut guard = self.slot.write();
        if let Some(slot) = guard.as_ref() {
            if slot.pid == pid {
                return Ok(Arc::clone(&slot.value));
            }
            tracing::debug!(stale_pid = slot.pid, pid, "discarding value built in another process");
        }

        let value = Arc::new(init()?);
        *guard = Some(Slot {
            pid,
            value: Arc::clone(&value),
        });
        Ok(value)
    }

    /// Install a value for the current process, replacing any cached one.
    pub fn set(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.slot.write() = Some(Slot {
            pid: (self.pid)(),
            value: Arc::clone(&value),
        });
        value
    }

    /// Drop the cached value.
    pub fn invalidate(&self) {
        self.slot.write().take();
    }
}
