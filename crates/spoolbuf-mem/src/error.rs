use std::io;

use thiserror::Error;

/// Result type local to spoolbuf-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "memory budget exceeded for tag '{tag}': requested {requested} bytes, \
         capacity {capacity}, used {used}"
    )]
    BudgetExceeded {
        tag: &'static str,
        requested: usize,
        capacity: usize,
        used: usize,
    },

    #[error("spill file {op}: {source}")]
    Spill {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("reading source: {0}")]
    Source(#[source] io::Error),

    #[error("writer must be in write-only mode to accept data")]
    NotWritable,

    #[error("writer is already finalized")]
    AlreadyFinalized,

    #[error("writer must be finalized before opening a reader")]
    NotFinalized,

    #[error("writer unusable after an earlier spill failure: {0}")]
    Poisoned(String),

    #[error(transparent)]
    Core(#[from] spoolbuf_core::Error),
}

impl Error {
    pub(crate) fn spill(op: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Error::Spill { op, source }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Spill { source, .. } | Error::Source(source) => source,
            other => io::Error::other(other),
        }
    }
}
