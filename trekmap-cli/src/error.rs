//! Error types emitted by the trekmap CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use trekmap_core::{EngineError, MappingError};
use trekmap_data::{ElementStreamError, PersistRowsError};

/// Errors emitted by the trekmap CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable that may supply the value.
        env: &'static str,
    },
    /// The ring strategy is neither `union` nor `contains`.
    #[error("unknown ring strategy {value:?} (expected \"union\" or \"contains\")")]
    UnknownStrategy {
        /// Rejected value.
        value: String,
    },
    /// A referenced input path does not exist or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Flag naming the input.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag naming the input.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The output path names an existing directory.
    #[error("output path {path:?} is a directory")]
    OutputIsDirectory {
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// Reading the mapping file failed.
    #[error("failed to read mapping file {path:?}: {source}")]
    ReadMapping {
        /// Mapping file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The mapping file is not a valid table mapping.
    #[error("invalid table mapping in {path:?}: {source}")]
    InvalidMapping {
        /// Mapping file path.
        path: Utf8PathBuf,
        /// Validation or parse failure.
        #[source]
        source: MappingError,
    },
    /// The worker pool could not be started.
    #[error(transparent)]
    StartEngine(#[from] EngineError),
    /// Reading decoded elements failed.
    #[error("failed to read elements: {0}")]
    ReadElements(#[from] ElementStreamError),
    /// Persisting rows to SQLite failed.
    #[error("failed to persist rows into {path:?}: {source}")]
    PersistRows {
        /// Destination database.
        path: Utf8PathBuf,
        /// Underlying persistence failure.
        #[source]
        source: PersistRowsError,
    },
    /// Serialising the import summary failed.
    #[error("failed to serialise import summary: {0}")]
    SerializeSummary(#[source] serde_json::Error),
}
