//! Cloneable alias over a single read handle.
//!
//! Every clone shares one handle and therefore one cursor. Handing one clone to
//! a `BufferedFileReader` and keeping another lets the caller go on reading
//! after the reader is closed.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex, MutexGuard};

use spoolbuf_core::ReadSeekClose;

pub struct SharedHandle<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for SharedHandle<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: ReadSeekClose> SharedHandle<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Another alias of the same handle.
    pub fn alias(&self) -> Self {
        self.clone()
    }

    /// Number of live aliases, this one included.
    pub fn aliases(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// The handle back, if this is the last alias.
    pub fn into_inner(self) -> Option<R> {
        Arc::try_unwrap(self.inner)
            .ok()
            .map(|m| m.into_inner().unwrap_or_else(|p| p.into_inner()))
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, R>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("shared read handle poisoned"))
    }
}

impl<R: ReadSeekClose> Read for SharedHandle<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.lock()?.read(buf)
    }
}

impl<R: ReadSeekClose> Seek for SharedHandle<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.lock()?.seek(pos)
    }
}

impl<R: ReadSeekClose> ReadSeekClose for SharedHandle<R> {
    fn close(&mut self) -> io::Result<()> {
        self.lock()?.close()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_aliases_share_cursor() {
        let mut a = SharedHandle::new(Cursor::new(b"abcdef".to_vec()));
        let mut b = a.alias();
        assert_eq!(a.aliases(), 2);

        let mut buf = [0u8; 2];
        a.read_exact(&mut buf).unwrap();
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cd");

        b.seek(SeekFrom::Start(0)).unwrap();
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");
    }

    #[test]
    fn test_into_inner_only_for_last_alias() {
        let a = SharedHandle::new(Cursor::new(vec![1u8, 2, 3]));
        let b = a.alias();
        assert!(a.into_inner().is_none());
        let cur = b.into_inner().expect("last alias");
        assert_eq!(cur.get_ref(), &vec![1u8, 2, 3]);
    }
}
