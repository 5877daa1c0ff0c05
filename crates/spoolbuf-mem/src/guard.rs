//! MemoryBudget + RAII guard implementations.
//!
//! Every pooled buffer holds a guard for its capacity. Dropping the guard
//! returns the bytes to the budget (panic-safe), which is what "returning a
//! buffer to the pool" means for accounting purposes.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use spoolbuf_core::budget::{BudgetGuard, MemoryBudget};

struct BudgetInner {
    capacity: usize,
    used: AtomicUsize,
}

impl BudgetInner {
    fn try_acquire(&self, bytes: usize) -> bool {
        let mut cur = self.used.load(Ordering::Relaxed);
        loop {
            let next = cur.saturating_add(bytes);
            if next > self.capacity {
                return false;
            }
            match self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(observed) => cur = observed,
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Byte budget shared by every buffer handed out from one pool.
#[derive(Clone)]
pub struct MemoryBudgetImpl {
    inner: Arc<BudgetInner>,
}

impl MemoryBudgetImpl {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            inner: Arc::new(BudgetInner {
                capacity: capacity_bytes,
                used: AtomicUsize::new(0),
            }),
        }
    }

    /// Bytes still available (advisory).
    pub fn available_bytes(&self) -> usize {
        self.inner
            .capacity
            .saturating_sub(self.inner.used.load(Ordering::Relaxed))
    }
}

impl fmt::Debug for MemoryBudgetImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBudgetImpl")
            .field("capacity", &self.inner.capacity)
            .field("used", &self.inner.used.load(Ordering::Relaxed))
            .finish()
    }
}

impl MemoryBudget for MemoryBudgetImpl {
    type Guard = BudgetGuardImpl;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard> {
        if bytes > 0 && !self.inner.try_acquire(bytes) {
            return None;
        }
        Some(BudgetGuardImpl {
            inner: Arc::clone(&self.inner),
            bytes,
            tag,
        })
    }

    fn capacity_bytes(&self) -> usize {
        self.inner.capacity
    }

    fn used_bytes(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }
}

/// RAII guard that accounts for a number of bytes.
/// Dropping it returns bytes to the budget.
pub struct BudgetGuardImpl {
    inner: Arc<BudgetInner>,
    bytes: usize,
    tag: &'static str,
}

impl BudgetGuardImpl {
    /// Try to resize this guard to a new byte count.
    /// Shrinking always succeeds; growing fails if the budget cannot cover the delta.
    pub fn try_resize(&mut self, new_bytes: usize) -> bool {
        if new_bytes <= self.bytes {
            self.inner.release(self.bytes - new_bytes);
            self.bytes = new_bytes;
            return true;
        }
        if self.inner.try_acquire(new_bytes - self.bytes) {
            self.bytes = new_bytes;
            true
        } else {
            false
        }
    }

    /// Move all accounted bytes into a new guard, leaving this one empty.
    pub fn split_off(&mut self) -> BudgetGuardImpl {
        let bytes = std::mem::take(&mut self.bytes);
        BudgetGuardImpl {
            inner: Arc::clone(&self.inner),
            bytes,
            tag: self.tag,
        }
    }
}

impl BudgetGuard for BudgetGuardImpl {
    fn bytes(&self) -> usize {
        self.bytes
    }
    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl fmt::Debug for BudgetGuardImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BudgetGuardImpl")
            .field("bytes", &self.bytes)
            .field("tag", &self.tag)
            .finish()
    }
}

impl Drop for BudgetGuardImpl {
    fn drop(&mut self) {
        if self.bytes > 0 {
            // NOTE: do not log here to keep drop path fast.
            self.inner.release(self.bytes);
            self.bytes = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release() {
        let budget = MemoryBudgetImpl::new(1024);
        let guard = budget.try_acquire(600, "test").expect("acquire");
        assert_eq!(budget.used_bytes(), 600);
        assert!(budget.try_acquire(600, "test").is_none());

        drop(guard);
        assert_eq!(budget.used_bytes(), 0);
        assert_eq!(budget.available_bytes(), 1024);
    }

    #[test]
    fn test_zero_byte_guard_always_granted() {
        let budget = MemoryBudgetImpl::new(0);
        let guard = budget.try_acquire(0, "empty").expect("zero acquire");
        assert_eq!(guard.bytes(), 0);
        assert_eq!(guard.tag(), "empty");
    }

    #[test]
    fn test_resize_grow_and_shrink() {
        let budget = MemoryBudgetImpl::new(100);
        let mut guard = budget.try_acquire(10, "test").unwrap();

        assert!(guard.try_resize(80));
        assert_eq!(budget.used_bytes(), 80);
        assert!(!guard.try_resize(101));
        assert_eq!(budget.used_bytes(), 80);

        assert!(guard.try_resize(5));
        assert_eq!(budget.used_bytes(), 5);
    }

    #[test]
    fn test_split_off_moves_accounting() {
        let budget = MemoryBudgetImpl::new(100);
        let mut guard = budget.try_acquire(40, "buf").unwrap();
        let lease = guard.split_off();

        assert_eq!(guard.bytes(), 0);
        assert_eq!(lease.bytes(), 40);
        assert_eq!(lease.tag(), "buf");

        drop(guard);
        assert_eq!(budget.used_bytes(), 40);
        drop(lease);
        assert_eq!(budget.used_bytes(), 0);
    }
}
