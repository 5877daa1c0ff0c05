//! Capability interface between a spooling provider and its readers.
//!
//! A provider ingests a byte stream, is finalized to read-only exactly once,
//! and then hands out read handles over the buffered bytes. Whether the bytes
//! live in memory or on disk is invisible through these traits.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek};

use crate::context::Context;

/// A readable, seekable handle that can give its resources back.
///
/// `close` returns pooled resources. It is not required to make the handle
/// unusable; implementations document what remains readable afterwards.
pub trait ReadSeekClose: Read + Seek {
    fn close(&mut self) -> io::Result<()>;
}

/// A readable handle without seek support.
pub trait ReadClose: Read {
    fn close(&mut self) -> io::Result<()>;
}

// Cursors and files own nothing pooled; close is a no-op.
impl<T: AsRef<[u8]>> ReadSeekClose for Cursor<T> {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ReadSeekClose for File {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R: ReadSeekClose + ?Sized> ReadSeekClose for Box<R> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// What a provider hands back from `open_reader`.
pub enum ReaderHandle {
    Seekable(Box<dyn ReadSeekClose + Send>),
    Sequential(Box<dyn ReadClose + Send>),
}

impl ReaderHandle {
    pub fn is_seekable(&self) -> bool {
        matches!(self, ReaderHandle::Seekable(_))
    }

    /// The seekable handle, or `None` for sequential-only handles.
    pub fn into_seekable(self) -> Option<Box<dyn ReadSeekClose + Send>> {
        match self {
            ReaderHandle::Seekable(r) => Some(r),
            ReaderHandle::Sequential(_) => None,
        }
    }
}

impl std::fmt::Debug for ReaderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderHandle::Seekable(_) => f.write_str("ReaderHandle::Seekable(..)"),
            ReaderHandle::Sequential(_) => f.write_str("ReaderHandle::Sequential(..)"),
        }
    }
}

/// The buffer-then-finalize collaborator a random-access reader is built on.
pub trait SpoolProvider {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Drain `source` completely into buffered storage. Returns bytes ingested.
    ///
    /// Implementations check `ctx` between chunks and stop with a context
    /// error once it is cancelled or past its deadline.
    fn ingest(&mut self, ctx: &Context, source: &mut dyn Read) -> Result<u64, Self::Error>;

    /// Irreversibly stop accepting writes. Fails if already finalized.
    fn finalize(&mut self) -> Result<(), Self::Error>;

    /// A fresh read handle over the complete buffered content, cursor at 0.
    fn open_reader(&mut self) -> Result<ReaderHandle, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_close_keeps_reading() {
        let mut cur = Cursor::new(b"abc".to_vec());
        cur.close().unwrap();
        let mut out = String::new();
        cur.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_into_seekable() {
        struct Seq;
        impl Read for Seq {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Ok(0)
            }
        }
        impl ReadClose for Seq {
            fn close(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let seekable = ReaderHandle::Seekable(Box::new(Cursor::new(Vec::<u8>::new())));
        assert!(seekable.is_seekable());
        assert!(seekable.into_seekable().is_some());

        let sequential = ReaderHandle::Sequential(Box::new(Seq));
        assert!(!sequential.is_seekable());
        assert!(sequential.into_seekable().is_none());
    }
}
