#![forbid(unsafe_code)]
//! spoolbuf-mem: hard memory budgeting, pooled buffers, and the spooling writer.
//!
//! `BufferedFileWriter` buffers written bytes in a pooled, budget-accounted
//! buffer until a threshold is crossed, then moves everything to a temporary
//! file. Once finalized it hands out seekable readers over the content, and is
//! the default `SpoolProvider` used by `spoolbuf-io`.

pub mod error;
pub mod guard;
pub mod handle;
pub mod pool;
pub mod spill;
pub mod tracking;
pub mod writer;

pub use guard::{BudgetGuardImpl, MemoryBudgetImpl};
pub use handle::{MemReader, SpillReader};
pub use pool::{BufferPool, OwnedBuf, PoolLease, SharedBuf};
pub use writer::BufferedFileWriter;
