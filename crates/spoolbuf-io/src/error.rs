use std::fmt;

use thiserror::Error;

/// Result type for reader construction.
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Which step of reader construction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Ingest,
    Finalize,
    OpenReader,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Setup => "configuring writer",
            Stage::Ingest => "ingesting source",
            Stage::Finalize => "finalizing writer",
            Stage::OpenReader => "opening reader",
        })
    }
}

/// Errors from building a `BufferedFileReader`.
///
/// Reads and seeks on a built reader return plain `std::io::Error`.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("error creating buffered file reader: {stage}: {source}")]
    Construction {
        stage: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("reader does not support seeking")]
    CapabilityMismatch,

    #[error("error creating buffered file reader: {0}")]
    Cancelled(#[source] spoolbuf_core::Error),
}

impl ReaderError {
    pub(crate) fn construction<E>(stage: Stage) -> impl FnOnce(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        move |e| ReaderError::Construction {
            stage,
            source: Box::new(e),
        }
    }

    /// The failing stage for construction errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ReaderError::Construction { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
