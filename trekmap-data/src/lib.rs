//! Input and output adapters for the trekmap engine.
//!
//! Responsibilities:
//! - Stream decoded elements from JSON-lines files.
//! - Persist mapped rows into SQLite tables derived from the table mapping.
//! - Provide capability-based filesystem helpers shared by both adapters.
//!
//! Boundaries:
//! - Do not encode mapping rules (live in `trekmap-core`).
//! - Decoding PBF or XML sources is left to the upstream decoder.
#![forbid(unsafe_code)]

mod elements;
pub mod fs;
mod sqlite;

pub use elements::{ElementReader, ElementStreamError, read_elements};
pub use sqlite::{DEFAULT_TABLE_PREFIX, PersistRowsError, SqliteSink};
