//! In-memory provider for tests and small payloads.
//!
//! Never spills and never touches a pool: bytes live in a plain `Vec` until
//! finalized, then in a shared `Arc<[u8]>` that every reader cursors over.

use std::io::{self, Cursor, Read};
use std::sync::Arc;

use spoolbuf_core::{Context, ReadClose, ReaderHandle, SpoolProvider};
use spoolbuf_mem::error::{Error as MemError, Result as MemResult};

const CHUNK: usize = 8 * 1024;

#[derive(Debug, Default)]
pub struct MemoryProvider {
    pending: Vec<u8>,
    frozen: Option<Arc<[u8]>>,
    sequential_only: bool,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose readers cannot seek.
    pub fn sequential_only() -> Self {
        Self {
            sequential_only: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        match &self.frozen {
            Some(bytes) => bytes.len(),
            None => self.pending.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finalized(&self) -> bool {
        self.frozen.is_some()
    }
}

impl SpoolProvider for MemoryProvider {
    type Error = MemError;

    fn ingest(&mut self, ctx: &Context, source: &mut dyn Read) -> MemResult<u64> {
        if self.frozen.is_some() {
            return Err(MemError::NotWritable);
        }
        let mut chunk = [0u8; CHUNK];
        let mut total = 0u64;
        loop {
            ctx.err()?;
            match source.read(&mut chunk) {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    total += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(MemError::Source(e)),
            }
        }
    }

    fn finalize(&mut self) -> MemResult<()> {
        if self.frozen.is_some() {
            return Err(MemError::AlreadyFinalized);
        }
        self.frozen = Some(Arc::from(std::mem::take(&mut self.pending)));
        Ok(())
    }

    fn open_reader(&mut self) -> MemResult<ReaderHandle> {
        let bytes = self.frozen.clone().ok_or(MemError::NotFinalized)?;
        let cursor = Cursor::new(bytes);
        if self.sequential_only {
            Ok(ReaderHandle::Sequential(Box::new(Sequential(cursor))))
        } else {
            Ok(ReaderHandle::Seekable(Box::new(cursor)))
        }
    }
}

/// Hides `Seek` from a cursor.
struct Sequential(Cursor<Arc<[u8]>>);

impl Read for Sequential {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl ReadClose for Sequential {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
