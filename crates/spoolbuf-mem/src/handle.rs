//! Read handles handed out by a finalized `BufferedFileWriter`.
//!
//! Closing a handle gives back what it holds on behalf of the pool (the budget
//! lease, or its share of the spill file). Neither handle becomes unreadable on
//! close: the bytes stay reachable for as long as the handle itself lives.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

use spoolbuf_core::ReadSeekClose;
use tempfile::TempPath;

use crate::pool::{PoolLease, SharedBuf};

/// Cursor over bytes that never left memory.
#[derive(Debug)]
pub struct MemReader {
    cursor: Cursor<SharedBuf>,
    lease: Option<PoolLease>,
}

impl MemReader {
    pub fn new(buf: SharedBuf, lease: Option<PoolLease>) -> Self {
        Self {
            cursor: Cursor::new(buf),
            lease,
        }
    }

    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    /// Whether this handle still holds the buffer's budget lease.
    pub fn holds_lease(&self) -> bool {
        self.lease.is_some()
    }
}

impl Read for MemReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl ReadSeekClose for MemReader {
    fn close(&mut self) -> io::Result<()> {
        if let Some(lease) = self.lease.take() {
            #[cfg(feature = "tracing")]
            tracing::trace!(bytes = lease.bytes(), "memory reader returned lease");
            drop(lease);
        }
        Ok(())
    }
}

/// File handle over a spilled buffer.
#[derive(Debug)]
pub struct SpillReader {
    file: File,
    path: Option<Arc<TempPath>>,
}

impl SpillReader {
    pub(crate) fn new(file: File, path: Arc<TempPath>) -> Self {
        Self {
            file,
            path: Some(path),
        }
    }
}

impl Read for SpillReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for SpillReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl ReadSeekClose for SpillReader {
    /// Drops this handle's share of the spill path. The open descriptor keeps
    /// serving reads even once the file is unlinked (on Unix).
    fn close(&mut self) -> io::Result<()> {
        if let Some(path) = self.path.take() {
            #[cfg(feature = "tracing")]
            tracing::trace!(path = %path.display(), "spill reader released path");
            drop(path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use spoolbuf_core::budget::MemoryBudget;

    use super::*;
    use crate::guard::MemoryBudgetImpl;
    use crate::pool::BufferPool;

    #[test]
    fn test_mem_reader_close_returns_lease_but_keeps_bytes() {
        let pool = BufferPool::new(MemoryBudgetImpl::new(1024), 8, 4);
        let mut buf = pool.get("test").unwrap();
        assert!(buf.try_extend(b"hello world"));
        let (shared, lease) = buf.freeze();

        let mut reader = MemReader::new(shared, Some(lease));
        assert!(reader.holds_lease());
        assert!(pool.budget().used_bytes() > 0);

        reader.close().unwrap();
        assert!(!reader.holds_lease());
        assert_eq!(pool.budget().used_bytes(), 0);

        reader.seek(SeekFrom::Start(6)).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "world");

        // Closing twice is harmless.
        reader.close().unwrap();
        drop(reader);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_mem_reader_seek_semantics() {
        let mut reader = MemReader::new(SharedBuf::detached(b"abcdef".to_vec()), None);
        assert_eq!(reader.len(), 6);
        assert_eq!(reader.seek(SeekFrom::End(-2)).unwrap(), 4);
        assert_eq!(reader.seek(SeekFrom::Current(-1)).unwrap(), 3);

        let err = reader.seek(SeekFrom::Current(-10)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        assert_eq!(reader.seek(SeekFrom::Start(100)).unwrap(), 100);
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }
}
