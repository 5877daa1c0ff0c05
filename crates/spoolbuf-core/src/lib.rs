#![forbid(unsafe_code)]
//! spoolbuf-core: the narrow interfaces shared by the spooling writer and the
//! random-access reader.
//!
//! Only traits, configuration and the cancellation context live here. The
//! memory budget and buffer pool are implemented in `spoolbuf-mem`; the
//! read adapter lives in `spoolbuf-io`.

pub mod budget;
pub mod config;
pub mod context;
pub mod error;
pub mod provider;

pub use config::SpoolConfig;
pub use context::{CancelToken, Context};
pub use error::{Error, Result};
pub use provider::{ReadClose, ReadSeekClose, ReaderHandle, SpoolProvider};
