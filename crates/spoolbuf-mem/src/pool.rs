//! Reusable byte buffers accounted against a hard MemoryBudget.
//!
//! A buffer has two independent lifetimes once it is frozen for reading:
//! - the `PoolLease`, which holds the budget bytes and is given back when a
//!   reader is closed;
//! - the `SharedBuf`, a reference-counted view of the bytes. The `Vec` goes back
//!   onto the idle list only when the last `SharedBuf` clone is dropped, so a
//!   reader alias that outlives `close` never sees its bytes reused.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use once_cell::sync::Lazy;
use spoolbuf_core::budget::{BudgetGuard, MemoryBudget};
use spoolbuf_core::SpoolConfig;

use crate::error::{Error, Result};
use crate::guard::{BudgetGuardImpl, MemoryBudgetImpl};
use crate::tracking::PeakTracker;

static GLOBAL_POOL: Lazy<BufferPool> =
    Lazy::new(|| BufferPool::from_config(&SpoolConfig::from_env()));

struct PoolShared {
    budget: MemoryBudgetImpl,
    idle: Mutex<Vec<Vec<u8>>>,
    initial_capacity: usize,
    max_idle: usize,
    peak: PeakTracker,
}

impl PoolShared {
    fn idle(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        // A panic while holding the lock cannot leave the list inconsistent.
        self.idle.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn recycle(&self, mut buf: Vec<u8>) {
        if buf.capacity() == 0 {
            return;
        }
        buf.clear();
        let mut idle = self.idle();
        if idle.len() < self.max_idle {
            #[cfg(feature = "tracing")]
            tracing::trace!(capacity = buf.capacity(), idle = idle.len() + 1, "buffer recycled");
            idle.push(buf);
        }
    }

    fn record_usage(&self) {
        self.peak.record_used(self.budget.used_bytes());
    }
}

/// Shared pool of byte buffers. Cloning yields another handle to the same pool.
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

impl BufferPool {
    pub fn new(budget: MemoryBudgetImpl, initial_capacity: usize, max_idle: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                budget,
                idle: Mutex::new(Vec::new()),
                initial_capacity,
                max_idle,
                peak: PeakTracker::new(),
            }),
        }
    }

    pub fn from_config(cfg: &SpoolConfig) -> Self {
        Self::new(
            MemoryBudgetImpl::new(cfg.mem_cap_bytes),
            cfg.initial_buffer_bytes,
            cfg.max_idle_buffers,
        )
    }

    /// Process-wide pool configured from the environment on first use.
    pub fn global() -> &'static BufferPool {
        &GLOBAL_POOL
    }

    /// Take an empty buffer, reusing an idle one when available.
    ///
    /// The buffer's whole capacity is accounted against the budget. A recycled
    /// buffer too large for the remaining budget is discarded in favour of a
    /// fresh one of the initial capacity.
    pub fn get(&self, tag: &'static str) -> Result<OwnedBuf> {
        let recycled = self.shared.idle().pop();
        if let Some(buf) = recycled {
            match self.shared.budget.try_acquire(buf.capacity(), tag) {
                Some(guard) => return Ok(self.checked_out(guard, buf)),
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(
                        capacity = buf.capacity(),
                        "recycled buffer over budget, dropped"
                    );
                }
            }
        }

        let buf = Vec::with_capacity(self.shared.initial_capacity);
        let cap = buf.capacity();
        match self.shared.budget.try_acquire(cap, tag) {
            Some(guard) => Ok(self.checked_out(guard, buf)),
            None => Err(Error::BudgetExceeded {
                tag,
                requested: cap,
                capacity: self.shared.budget.capacity_bytes(),
                used: self.shared.budget.used_bytes(),
            }),
        }
    }

    fn checked_out(&self, guard: BudgetGuardImpl, buf: Vec<u8>) -> OwnedBuf {
        self.shared.record_usage();
        OwnedBuf {
            guard,
            buf,
            pool: Arc::downgrade(&self.shared),
        }
    }

    /// Number of buffers waiting for reuse.
    pub fn idle(&self) -> usize {
        self.shared.idle().len()
    }

    pub fn budget(&self) -> &MemoryBudgetImpl {
        &self.shared.budget
    }

    /// Highest budget usage observed by this pool.
    pub fn peak_bytes(&self) -> usize {
        self.shared.peak.peak()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("budget", &self.shared.budget)
            .field("idle", &self.idle())
            .field("max_idle", &self.shared.max_idle)
            .finish()
    }
}

/// Growable buffer checked out of a `BufferPool`. Dropping it recycles the `Vec`
/// and releases its budget bytes.
pub struct OwnedBuf {
    guard: BudgetGuardImpl,
    buf: Vec<u8>,
    pool: Weak<PoolShared>,
}

impl OwnedBuf {
    /// Bytes currently accounted against the budget (at least `len()`).
    pub fn accounted_bytes(&self) -> usize {
        self.guard.bytes()
    }

    /// Append `data` if the budget can cover the required capacity.
    /// Returns false, leaving the buffer untouched, when it cannot.
    pub fn try_extend(&mut self, data: &[u8]) -> bool {
        let needed = self.buf.len().saturating_add(data.len());
        if needed > self.guard.bytes() {
            // Prefer doubling; fall back to the exact size near the cap.
            let doubled = needed.max(self.guard.bytes().saturating_mul(2));
            if !self.guard.try_resize(doubled) && !self.guard.try_resize(needed) {
                return false;
            }
            let target = self.guard.bytes();
            self.buf.reserve_exact(target - self.buf.len());
            if let Some(pool) = self.pool.upgrade() {
                pool.record_usage();
            }
        }
        self.buf.extend_from_slice(data);
        true
    }

    /// Make the bytes read-only and shareable, splitting off the budget lease.
    pub fn freeze(mut self) -> (SharedBuf, PoolLease) {
        let buf = std::mem::take(&mut self.buf);
        let guard = self.guard.split_off();
        let shared = SharedBuf(Arc::new(Recycled {
            buf,
            pool: self.pool.clone(),
        }));
        (shared, PoolLease { guard })
    }
}

impl Deref for OwnedBuf {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl Drop for OwnedBuf {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.upgrade() {
            pool.recycle(std::mem::take(&mut self.buf));
        }
    }
}

impl fmt::Debug for OwnedBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedBuf")
            .field("len", &self.buf.len())
            .field("accounted", &self.guard.bytes())
            .finish()
    }
}

struct Recycled {
    buf: Vec<u8>,
    pool: Weak<PoolShared>,
}

impl Drop for Recycled {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.upgrade() {
            pool.recycle(std::mem::take(&mut self.buf));
        }
    }
}

/// Read-only, reference-counted bytes frozen from an `OwnedBuf`.
#[derive(Clone)]
pub struct SharedBuf(Arc<Recycled>);

impl SharedBuf {
    /// Bytes not backed by any pool.
    pub fn empty() -> Self {
        Self::detached(Vec::new())
    }

    /// Wrap bytes that did not come from a pool; nothing is recycled on drop.
    pub fn detached(buf: Vec<u8>) -> Self {
        SharedBuf(Arc::new(Recycled {
            buf,
            pool: Weak::new(),
        }))
    }

    pub fn len(&self) -> usize {
        self.0.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.buf.is_empty()
    }

    /// Live views of these bytes, this one included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl AsRef<[u8]> for SharedBuf {
    fn as_ref(&self) -> &[u8] {
        &self.0.buf
    }
}

impl fmt::Debug for SharedBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuf")
            .field("len", &self.len())
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Pool membership of a frozen buffer: its accounted budget bytes.
/// Dropping the lease gives those bytes back to the budget.
#[derive(Debug)]
pub struct PoolLease {
    guard: BudgetGuardImpl,
}

impl PoolLease {
    pub fn bytes(&self) -> usize {
        self.guard.bytes()
    }
}
