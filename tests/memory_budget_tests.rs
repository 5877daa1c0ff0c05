//! Budget and pool accounting under shared use

use spoolbuf_core::budget::{BudgetGuard, MemoryBudget};
use spoolbuf_core::{Context, ReadSeekClose, SpoolConfig};
use spoolbuf_mem::{BufferPool, BufferedFileWriter, MemoryBudgetImpl};
use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;

fn spill_cfg(dir: &std::path::Path, threshold: usize) -> SpoolConfig {
    SpoolConfig {
        threshold_bytes: threshold,
        spill_dir: Some(dir.to_string_lossy().to_string()),
        ..SpoolConfig::default()
    }
}

#[test]
fn test_budget_concurrent_access() {
    let budget = Arc::new(MemoryBudgetImpl::new(1024 * 1024)); // 1MB shared
    let mut handles = vec![];

    for _ in 0..10 {
        let budget_clone: Arc<MemoryBudgetImpl> = Arc::clone(&budget);
        handles.push(thread::spawn(move || {
            if let Some(guard) = budget_clone.try_acquire(50 * 1024, "test") {
                thread::sleep(std::time::Duration::from_millis(5));
                assert_eq!(guard.bytes(), 50 * 1024);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(budget.used_bytes(), 0);
    let full_guard = budget
        .try_acquire(1024 * 1024, "test")
        .expect("Should be able to acquire full budget");
    drop(full_guard);
}

#[test]
fn test_budget_exact_capacity() {
    let budget = MemoryBudgetImpl::new(1024);
    let guard = budget
        .try_acquire(1024, "test")
        .expect("Should acquire exact capacity");
    assert!(budget.try_acquire(1, "test").is_none());
    drop(guard);
    assert_eq!(budget.used_bytes(), 0);
}

#[test]
fn test_pool_shared_by_concurrent_writers() {
    let dir = tempfile::tempdir().unwrap();
    // Room for roughly two in-memory writers; the rest have to spill.
    let pool = BufferPool::new(MemoryBudgetImpl::new(64 * 1024), 1024, 16);
    let mut handles = vec![];

    for i in 0..8u8 {
        let pool = pool.clone();
        let cfg = spill_cfg(dir.path(), 32 * 1024);
        handles.push(thread::spawn(move || {
            let mut w = BufferedFileWriter::new(pool, cfg).unwrap();
            for _ in 0..30 {
                w.write_all(&[i; 1000]).unwrap();
            }
            w.finalize().unwrap();
            let mut r = w.reader().unwrap();
            let mut out = Vec::new();
            r.read_to_end(&mut out).unwrap();
            assert_eq!(out.len(), 30_000);
            assert!(out.iter().all(|b| *b == i));
            r.close().unwrap();
        }));
    }
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(pool.budget().used_bytes(), 0);
    assert!(pool.peak_bytes() <= 64 * 1024);
    assert!(pool.idle() > 0);
}

#[test]
fn test_pool_buffer_reused_across_writers() {
    let dir = tempfile::tempdir().unwrap();
    let pool = BufferPool::new(MemoryBudgetImpl::new(1024 * 1024), 256, 4);

    for round in 0..3 {
        let w = BufferedFileWriter::from_reader_with(
            &Context::background(),
            &b"short payload"[..],
            pool.clone(),
            spill_cfg(dir.path(), 1024),
        )
        .unwrap();
        assert!(!w.is_spilled(), "round {round} spilled");
        drop(w);
        assert_eq!(pool.idle(), 1);
        assert_eq!(pool.budget().used_bytes(), 0);
    }
}

