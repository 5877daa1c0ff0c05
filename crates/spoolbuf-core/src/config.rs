//! Spooling configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_THRESHOLD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MEM_CAP_BYTES: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoolConfig {
    /// Once the in-memory buffer would grow past this many bytes, the writer
    /// spills everything to a temporary file.
    pub threshold_bytes: usize,

    /// Hard cap on leased bytes across all writers sharing a pool. Closing a
    /// reader returns its lease; bytes an alias keeps alive after that are no
    /// longer counted.
    pub mem_cap_bytes: usize,

    /// Capacity of a freshly allocated pool buffer.
    pub initial_buffer_bytes: usize,

    /// Maximum number of idle buffers the pool keeps for reuse.
    pub max_idle_buffers: usize,

    /// Chunk size used when draining a source stream.
    pub copy_chunk_bytes: usize,

    /// Directory for spill files. `None` means the OS temp dir.
    pub spill_dir: Option<String>,

    /// File name prefix for spill files.
    pub temp_prefix: String,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: DEFAULT_THRESHOLD_BYTES,
            mem_cap_bytes: DEFAULT_MEM_CAP_BYTES,
            initial_buffer_bytes: 4 * 1024,
            max_idle_buffers: 64,
            copy_chunk_bytes: 32 * 1024,
            spill_dir: None,
            temp_prefix: "spoolbuf-".to_string(),
        }
    }
}

impl SpoolConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SPOOLBUF_THRESHOLD_BYTES`: in-memory threshold before spilling
    /// - `SPOOLBUF_MEM_CAP_BYTES`: pool memory cap in bytes
    /// - `SPOOLBUF_INITIAL_BUFFER_BYTES`: initial pooled buffer capacity
    /// - `SPOOLBUF_MAX_IDLE_BUFFERS`: idle buffers retained by the pool
    /// - `SPOOLBUF_COPY_CHUNK_BYTES`: drain chunk size
    /// - `SPOOLBUF_SPILL_DIR`: spill directory
    /// - `SPOOLBUF_TEMP_PREFIX`: spill file prefix
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_parse::<usize>("SPOOLBUF_THRESHOLD_BYTES") {
            cfg.threshold_bytes = v;
        }

        if let Some(v) = env_parse::<usize>("SPOOLBUF_MEM_CAP_BYTES") {
            cfg.mem_cap_bytes = v;
        }

        if let Some(v) = env_parse::<usize>("SPOOLBUF_INITIAL_BUFFER_BYTES") {
            cfg.initial_buffer_bytes = v;
        }

        if let Some(v) = env_parse::<usize>("SPOOLBUF_MAX_IDLE_BUFFERS") {
            cfg.max_idle_buffers = v;
        }

        if let Some(v) = env_parse::<usize>("SPOOLBUF_COPY_CHUNK_BYTES") {
            cfg.copy_chunk_bytes = v;
        }

        if let Ok(s) = std::env::var("SPOOLBUF_SPILL_DIR") {
            if !s.trim().is_empty() {
                cfg.spill_dir = Some(s);
            }
        }

        if let Ok(s) = std::env::var("SPOOLBUF_TEMP_PREFIX") {
            cfg.temp_prefix = s;
        }

        cfg
    }

    /// Reject settings the writer cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.threshold_bytes == 0 {
            return Err(Error::Config("threshold_bytes must be > 0".into()));
        }
        if self.copy_chunk_bytes == 0 {
            return Err(Error::Config("copy_chunk_bytes must be > 0".into()));
        }
        if self.threshold_bytes > self.mem_cap_bytes {
            return Err(Error::Config(format!(
                "threshold_bytes {} exceeds mem_cap_bytes {}",
                self.threshold_bytes, self.mem_cap_bytes
            )));
        }
        Ok(())
    }

    /// Directory spill files are created in.
    pub fn spill_dir_path(&self) -> std::path::PathBuf {
        match &self.spill_dir {
            Some(dir) => std::path::PathBuf::from(dir),
            None => std::env::temp_dir(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let cfg = SpoolConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.threshold_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let cfg = SpoolConfig {
            threshold_bytes: 0,
            ..SpoolConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("threshold_bytes"));
    }

    #[test]
    fn test_validate_rejects_threshold_above_cap() {
        let cfg = SpoolConfig {
            threshold_bytes: 2048,
            mem_cap_bytes: 1024,
            ..SpoolConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: SpoolConfig = serde_json::from_str(r#"{"threshold_bytes": 64}"#).unwrap();
        assert_eq!(cfg.threshold_bytes, 64);
        assert_eq!(cfg.temp_prefix, "spoolbuf-");
        assert_eq!(cfg.spill_dir, None);
    }

    #[test]
    fn test_spill_dir_defaults_to_temp() {
        let cfg = SpoolConfig::default();
        assert_eq!(cfg.spill_dir_path(), std::env::temp_dir());

        let cfg = SpoolConfig {
            spill_dir: Some("/var/tmp/spool".into()),
            ..SpoolConfig::default()
        };
        assert_eq!(cfg.spill_dir_path(), std::path::PathBuf::from("/var/tmp/spool"));
    }
}
