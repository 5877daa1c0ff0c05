//! Buffer-then-spill writer.
//!
//! Bytes go into a pooled buffer while the total stays within
//! `threshold_bytes` and the pool's budget can cover growth. The first write
//! that would break either limit moves the buffered bytes into a temp file,
//! returns the buffer to the pool, and appends everything after that to the
//! file. `finalize` switches the writer to read-only; only then can readers
//! be opened.

use std::io::{self, Read, Write};
use std::path::Path;

use spoolbuf_core::{Context, ReadSeekClose, ReaderHandle, SpoolConfig, SpoolProvider};

use crate::error::{Error, Result};
use crate::handle::MemReader;
use crate::pool::{BufferPool, OwnedBuf, PoolLease, SharedBuf};
use crate::spill::{SealedSpill, SpillFile};

const BUFFER_TAG: &str = "spool_buffer";

enum Buffered {
    Empty,
    Memory(OwnedBuf),
    Spilled(SpillFile),
}

impl Buffered {
    fn len(&self) -> u64 {
        match self {
            Buffered::Empty => 0,
            Buffered::Memory(buf) => buf.len() as u64,
            Buffered::Spilled(file) => file.len(),
        }
    }

    fn append(&mut self, pool: &BufferPool, cfg: &SpoolConfig, data: &[u8]) -> Result<()> {
        if let Buffered::Spilled(file) = self {
            return file.write_all(data);
        }

        let buffered = self.len() as usize;
        if buffered.saturating_add(data.len()) <= cfg.threshold_bytes {
            if let Buffered::Empty = self {
                // An exhausted budget is not an error here: fall through to disk.
                if let Ok(buf) = pool.get(BUFFER_TAG) {
                    *self = Buffered::Memory(buf);
                }
            }
            if let Buffered::Memory(buf) = self {
                if buf.try_extend(data) {
                    return Ok(());
                }
            }
        }

        self.spill(cfg, data)
    }

    fn spill(&mut self, cfg: &SpoolConfig, data: &[u8]) -> Result<()> {
        let mut file = SpillFile::create(cfg)?;
        if let Buffered::Memory(buf) = self {
            file.write_all(&buf[..])?;
        }
        file.write_all(data)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            buffered = self.len(),
            incoming = data.len(),
            threshold = cfg.threshold_bytes,
            path = %file.path().display(),
            "spilling buffer to disk"
        );

        // Replacing a Memory variant drops the OwnedBuf, recycling it.
        *self = Buffered::Spilled(file);
        Ok(())
    }
}

enum Sealed {
    Memory {
        buf: SharedBuf,
        lease: Option<PoolLease>,
    },
    Spilled(SealedSpill),
}

enum State {
    WriteOnly(Buffered),
    ReadOnly(Sealed),
}

/// Spooling writer: memory first, temp file past the threshold.
pub struct BufferedFileWriter {
    pool: BufferPool,
    cfg: SpoolConfig,
    state: State,
    poisoned: Option<String>,
}

impl BufferedFileWriter {
    pub fn new(pool: BufferPool, cfg: SpoolConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            pool,
            cfg,
            state: State::WriteOnly(Buffered::Empty),
            poisoned: None,
        })
    }

    /// Writer on the process-wide pool, configured from the environment.
    pub fn with_defaults() -> Result<Self> {
        Self::new(BufferPool::global().clone(), SpoolConfig::from_env())
    }

    /// Build a default writer and drain `source` into it.
    pub fn from_reader<R: Read>(ctx: &Context, source: R) -> Result<Self> {
        Self::from_reader_with(ctx, source, BufferPool::global().clone(), SpoolConfig::from_env())
    }

    pub fn from_reader_with<R: Read>(
        ctx: &Context,
        mut source: R,
        pool: BufferPool,
        cfg: SpoolConfig,
    ) -> Result<Self> {
        let mut writer = Self::new(pool, cfg)?;
        writer.ingest(ctx, &mut source)?;
        Ok(writer)
    }

    /// Append `data`. Fails once the writer has been finalized.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        if let Some(msg) = &self.poisoned {
            return Err(Error::Poisoned(msg.clone()));
        }
        let buffered = match &mut self.state {
            State::WriteOnly(b) => b,
            State::ReadOnly(_) => return Err(Error::NotWritable),
        };
        if data.is_empty() {
            return Ok(0);
        }

        match buffered.append(&self.pool, &self.cfg, data) {
            Ok(()) => Ok(data.len()),
            Err(e) => {
                if matches!(e, Error::Spill { .. }) {
                    self.poisoned = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Drain `source` until EOF, checking `ctx` before each chunk.
    pub fn ingest(&mut self, ctx: &Context, source: &mut dyn Read) -> Result<u64> {
        let mut chunk = vec![0u8; self.cfg.copy_chunk_bytes];
        let mut total = 0u64;
        loop {
            ctx.err()?;
            let n = match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Source(e)),
            };
            self.write_bytes(&chunk[..n])?;
            total += n as u64;
        }
        Ok(total)
    }

    /// Stop accepting writes. The buffered length is fixed from here on.
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(msg) = &self.poisoned {
            return Err(Error::Poisoned(msg.clone()));
        }
        let buffered = match &mut self.state {
            State::WriteOnly(b) => std::mem::replace(b, Buffered::Empty),
            State::ReadOnly(_) => return Err(Error::AlreadyFinalized),
        };

        let sealed = match buffered {
            Buffered::Empty => Sealed::Memory {
                buf: SharedBuf::empty(),
                lease: None,
            },
            Buffered::Memory(buf) => {
                let (buf, lease) = buf.freeze();
                Sealed::Memory {
                    buf,
                    lease: Some(lease),
                }
            }
            Buffered::Spilled(file) => match file.seal() {
                Ok(sealed) => Sealed::Spilled(sealed),
                Err(e) => {
                    self.poisoned = Some(e.to_string());
                    return Err(e);
                }
            },
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            len = self.len_of(&sealed),
            spilled = matches!(sealed, Sealed::Spilled(_)),
            "writer finalized"
        );

        self.state = State::ReadOnly(sealed);
        Ok(())
    }

    /// Alias of `finalize`.
    pub fn close_for_writing(&mut self) -> Result<()> {
        self.finalize()
    }

    /// Open a reader over everything written, cursor at 0.
    ///
    /// For in-memory content the first reader takes the buffer's pool lease;
    /// closing that reader gives the lease back.
    pub fn reader(&mut self) -> Result<Box<dyn ReadSeekClose + Send>> {
        match &mut self.state {
            State::WriteOnly(_) => Err(Error::NotFinalized),
            State::ReadOnly(Sealed::Memory { buf, lease }) => {
                Ok(Box::new(MemReader::new(buf.clone(), lease.take())))
            }
            State::ReadOnly(Sealed::Spilled(spill)) => Ok(Box::new(spill.open()?)),
        }
    }

    /// Total bytes written so far.
    pub fn len(&self) -> u64 {
        match &self.state {
            State::WriteOnly(b) => b.len(),
            State::ReadOnly(sealed) => self.len_of(sealed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, State::ReadOnly(_))
    }

    pub fn is_spilled(&self) -> bool {
        matches!(
            self.state,
            State::WriteOnly(Buffered::Spilled(_)) | State::ReadOnly(Sealed::Spilled(_))
        )
    }

    /// Location of the spill file, if the writer spilled.
    pub fn spill_path(&self) -> Option<&Path> {
        match &self.state {
            State::WriteOnly(Buffered::Spilled(file)) => Some(file.path()),
            State::ReadOnly(Sealed::Spilled(spill)) => Some(spill.path()),
            _ => None,
        }
    }

    pub fn config(&self) -> &SpoolConfig {
        &self.cfg
    }

    fn len_of(&self, sealed: &Sealed) -> u64 {
        match sealed {
            Sealed::Memory { buf, .. } => buf.len() as u64,
            Sealed::Spilled(spill) => spill.len(),
        }
    }
}

impl Write for BufferedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SpoolProvider for BufferedFileWriter {
    type Error = Error;

    fn ingest(&mut self, ctx: &Context, source: &mut dyn Read) -> Result<u64> {
        BufferedFileWriter::ingest(self, ctx, source)
    }

    fn finalize(&mut self) -> Result<()> {
        BufferedFileWriter::finalize(self)
    }

    fn open_reader(&mut self) -> Result<ReaderHandle> {
        Ok(ReaderHandle::Seekable(self.reader()?))
    }
}
