//! Facade crate for the trekmap OSM mapping engine.
//!
//! This crate re-exports the engine types and exposes the SQLite persistence
//! and JSON-lines input adapters behind the `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use trekmap_core::{
    Assembly, AssemblyConfig, AssemblyError, Codec, Diagnostics, DiagnosticsSnapshot, Element,
    Engine, EngineConfig, EngineError, Mapping, MappingError, Record, RelationAssembler,
    RingStrategy, RowBuilder, RowSink, RunError, TableDefinition, Value,
};

#[cfg(feature = "test-support")]
pub use trekmap_core::test_support;

#[cfg(feature = "store-sqlite")]
pub use trekmap_data::{
    DEFAULT_TABLE_PREFIX, ElementStreamError, PersistRowsError, SqliteSink, read_elements,
};
