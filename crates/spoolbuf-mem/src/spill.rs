//! Temporary spill files.
//!
//! While writing, the file is a `NamedTempFile` owned by the writer. Sealing
//! closes the write handle and keeps only the path, shared by the writer and
//! every reader; the file is deleted when the last of them lets go.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use spoolbuf_core::SpoolConfig;
use tempfile::{NamedTempFile, TempPath};

use crate::error::{Error, Result};
use crate::handle::SpillReader;

pub struct SpillFile {
    file: NamedTempFile,
    len: u64,
}

impl SpillFile {
    /// Create an empty spill file in the configured spill directory.
    pub fn create(cfg: &SpoolConfig) -> Result<Self> {
        let dir = cfg.spill_dir_path();
        fs::create_dir_all(&dir).map_err(Error::spill("create dir"))?;
        let file = tempfile::Builder::new()
            .prefix(&cfg.temp_prefix)
            .suffix(".spool")
            .tempfile_in(&dir)
            .map_err(Error::spill("create"))?;
        Ok(Self { file, len: 0 })
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data).map_err(Error::spill("write"))?;
        self.len += data.len() as u64;
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Flush and close the write handle. No more bytes can be appended.
    pub fn seal(mut self) -> Result<SealedSpill> {
        self.file.flush().map_err(Error::spill("flush"))?;
        let (file, path) = self.file.into_parts();
        file.sync_data().map_err(Error::spill("sync"))?;
        drop(file);
        Ok(SealedSpill {
            path: Arc::new(path),
            len: self.len,
        })
    }
}

/// A finished spill file that readers can be opened on.
pub struct SealedSpill {
    path: Arc<TempPath>,
    len: u64,
}

impl SealedSpill {
    /// Open an independent read handle positioned at offset 0.
    pub fn open(&self) -> Result<SpillReader> {
        let file = File::open(&**self.path).map_err(Error::spill("open"))?;
        Ok(SpillReader::new(file, Arc::clone(&self.path)))
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use spoolbuf_core::ReadSeekClose;

    use super::*;

    fn cfg_in(dir: &Path) -> SpoolConfig {
        SpoolConfig {
            spill_dir: Some(dir.to_string_lossy().to_string()),
            ..SpoolConfig::default()
        }
    }

    #[test]
    fn test_spill_file_uses_prefix_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let spill = SpillFile::create(&cfg_in(dir.path())).unwrap();
        let name = spill.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("spoolbuf-"), "unexpected name {name}");
        assert!(name.ends_with(".spool"));
        assert_eq!(spill.path().parent().unwrap(), dir.path());
        assert!(spill.is_empty());
    }

    #[test]
    fn test_file_removed_after_last_holder() {
        let dir = tempfile::tempdir().unwrap();
        let mut spill = SpillFile::create(&cfg_in(dir.path())).unwrap();
        spill.write_all(b"spilled bytes").unwrap();
        assert_eq!(spill.len(), 13);

        let sealed = spill.seal().unwrap();
        let path = sealed.path().to_path_buf();
        let mut reader = sealed.open().unwrap();

        drop(sealed);
        assert!(path.exists(), "reader still references the file");

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "spilled bytes");

        reader.close().unwrap();
        assert!(!path.exists());
    }
}
