#![forbid(unsafe_code)]
//! spoolbuf-io: random-access reads over a spooled byte stream.
//!
//! `BufferedFileReader` drains a source into a `SpoolProvider`, finalizes it,
//! and then serves `Read`, `Seek` and cursor-relocating `read_at` over the
//! buffered bytes, whether they ended up in memory or in a spill file.

pub mod error;
pub mod memory_provider;
pub mod reader;
pub mod shared;

pub use error::{ReaderError, Result, Stage};
pub use memory_provider::MemoryProvider;
pub use reader::BufferedFileReader;
pub use shared::SharedHandle;
