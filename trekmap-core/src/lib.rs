//! Tag-to-schema mapping engine for OpenStreetMap imports.
//!
//! Decoded elements are classified against a declarative table [`Mapping`],
//! their tags are converted into typed columns by [`Codec`]s, multipolygon
//! relations are assembled into valid polygons, and the resulting
//! [`Record`]s are handed to a [`RowSink`]. Only malformed configuration is
//! fatal; everything that goes wrong while processing an element is logged
//! and counted in [`Diagnostics`].

#![forbid(unsafe_code)]

mod assemble;
mod build;
mod classify;
mod codec;
mod derived;
mod diagnostics;
mod element;
mod engine;
mod mapping;
mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use assemble::{
    Assembly, AssemblyConfig, AssemblyError, AssemblyReport, RelationAssembler, RingStrategy,
    repair_polygon,
};
pub use build::RowBuilder;
pub use classify::{Classification, classify};
pub use codec::{
    Codec, FieldContext, HeightParseError, Transliterator, parse_bool, parse_height,
};
pub use derived::{
    BRUNNEL_OFFSET, Direction, LAYER_STEP, Projection, pseudo_area, way_z_order, z_order,
};
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot};
pub use element::{Element, ElementGeometry, ElementKind, Member, Role, Tags};
pub use engine::{DEFAULT_BATCH_SIZE, Engine, EngineConfig, EngineError, RowSink, RunError};
pub use mapping::{
    ANY_VALUE, AllowedValues, FieldDeclaration, FieldFilter, GEOMETRY_COLUMN, GeometryCategory,
    LABEL_COLUMN, Mapping, MappingError, MappingRule, OSM_ID_COLUMN, TYPE_COLUMN,
    TableDefinition,
};
pub use value::{ColumnType, Record, Row, Value};
