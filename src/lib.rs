#![forbid(unsafe_code)]
//! spoolbuf: spool a byte stream into memory (or a temp file past a
//! threshold) and read it back with random access.
//!
//! Re-exports the pieces most callers need from the workspace crates.

pub use spoolbuf_core::{
    CancelToken, Context, ReadSeekClose, ReaderHandle, SpoolConfig, SpoolProvider,
};
pub use spoolbuf_io::{BufferedFileReader, MemoryProvider, ReaderError, SharedHandle, Stage};
pub use spoolbuf_mem::{BufferPool, BufferedFileWriter, MemoryBudgetImpl};
