//! Random-access reader built on a spooling provider.
//!
//! Construction drains the source into the provider, finalizes it, and takes
//! exactly one read handle. Everything after that is delegated to the handle,
//! whose cursor is shared by `read`, `seek` and `read_at`.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use spoolbuf_core::{Context, ReadSeekClose, SpoolConfig, SpoolProvider};
use spoolbuf_mem::{BufferPool, BufferedFileWriter};

use crate::error::{ReaderError, Result, Stage};

/// Read, seek, positional read and close over a finalized spool.
///
/// The adapter adds no locking. `read_at` moves the shared cursor, so callers
/// that interleave positional and sequential reads from several threads must
/// serialize access themselves (for example behind a `Mutex`).
pub struct BufferedFileReader<P: SpoolProvider = BufferedFileWriter> {
    provider: P,
    reader: Box<dyn ReadSeekClose + Send>,
}

impl BufferedFileReader<BufferedFileWriter> {
    /// Spool `source` through a writer on the global pool, configured from
    /// the environment.
    pub fn new<R: Read>(ctx: &Context, source: R) -> Result<Self> {
        let writer =
            BufferedFileWriter::with_defaults().map_err(ReaderError::construction(Stage::Setup))?;
        Self::with_provider(ctx, writer, source)
    }

    /// Spool `source` through a writer on `pool` with an explicit config.
    pub fn with_config<R: Read>(
        ctx: &Context,
        source: R,
        pool: BufferPool,
        cfg: SpoolConfig,
    ) -> Result<Self> {
        let writer =
            BufferedFileWriter::new(pool, cfg).map_err(ReaderError::construction(Stage::Setup))?;
        Self::with_provider(ctx, writer, source)
    }

    /// Total buffered bytes.
    pub fn len(&self) -> u64 {
        self.provider.len()
    }

    pub fn is_empty(&self) -> bool {
        self.provider.is_empty()
    }

    /// Whether the content ended up in a spill file rather than memory.
    pub fn is_spilled(&self) -> bool {
        self.provider.is_spilled()
    }
}

impl<P: SpoolProvider> BufferedFileReader<P> {
    /// Drain `source` into `provider`, finalize it, and open its reader.
    ///
    /// If `ctx` is cancelled or past its deadline while draining, or before
    /// finalizing, the result is `ReaderError::Cancelled`.
    pub fn with_provider<R: Read>(ctx: &Context, mut provider: P, mut source: R) -> Result<Self> {
        if let Err(e) = provider.ingest(ctx, &mut source) {
            ctx.err().map_err(ReaderError::Cancelled)?;
            return Err(ReaderError::construction(Stage::Ingest)(e));
        }
        ctx.err().map_err(ReaderError::Cancelled)?;

        // Read-only from here on; the buffered length is fixed.
        provider
            .finalize()
            .map_err(ReaderError::construction(Stage::Finalize))?;

        let reader = provider
            .open_reader()
            .map_err(ReaderError::construction(Stage::OpenReader))?
            .into_seekable()
            .ok_or(ReaderError::CapabilityMismatch)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("buffered file reader ready");

        Ok(Self { provider, reader })
    }

    /// Read into `buf` starting at absolute `offset`.
    ///
    /// This seeks the shared cursor to `offset` and performs a single read, so
    /// the cursor ends at `offset + n` rather than where it was before. A short
    /// read is returned as-is; callers wanting a full buffer must loop.
    /// Returns `Ok(0)` when `offset` is at or past the end.
    pub fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.reader.read(buf)
    }

    /// Give the read handle's pooled resources back.
    ///
    /// This returns the pool lease (or the spill file reference); it does not
    /// invalidate a separately retained alias of the handle, which keeps
    /// serving reads and seeks. The bytes themselves are recycled only after
    /// every alias is gone.
    pub fn close(mut self) -> io::Result<()> {
        let res = self.reader.close();

        #[cfg(feature = "tracing")]
        match &res {
            Ok(()) => tracing::debug!("buffered file reader closed"),
            Err(e) => tracing::debug!(error = %e, "buffered file reader close failed"),
        }

        res
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: SpoolProvider> Read for BufferedFileReader<P> {
    /// Returns `Ok(0)` once the cursor is at or past the end.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl<P: SpoolProvider> Seek for BufferedFileReader<P> {
    /// Pass-through: negative targets are rejected by the handle, and seeking
    /// past the end is allowed.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }
}

impl<P: SpoolProvider> fmt::Debug for BufferedFileReader<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedFileReader").finish_non_exhaustive()
    }
}
