//! Command-line interface for importing decoded OSM elements.
#![forbid(unsafe_code)]

mod error;

use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use trekmap_core::{
    AssemblyConfig, DiagnosticsSnapshot, Engine, EngineConfig, Mapping, RingStrategy, RunError,
};
use trekmap_data::fs::{file_is_file, open_utf8_file};
use trekmap_data::{DEFAULT_TABLE_PREFIX, SqliteSink, read_elements};

pub use error::CliError;

const ARG_ELEMENTS: &str = "elements";
const ARG_OUTPUT: &str = "output";
const ARG_MAPPING: &str = "mapping";
const ENV_ELEMENTS: &str = "TREKMAP_CMDS_IMPORT_ELEMENTS";
const ENV_OUTPUT: &str = "TREKMAP_CMDS_IMPORT_OUTPUT";

/// Run the trekmap CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when the configuration is invalid or the import fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Import(args) => {
            let outcome = run_import(args)?;
            report(&outcome)?;
        }
    }
    Ok(())
}

fn run_import(args: ImportArgs) -> Result<ImportOutcome, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    import(&config)
}

#[derive(Debug, Parser)]
#[command(
    name = "trekmap",
    about = "Map decoded OpenStreetMap elements into typed tables",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import a decoded element stream into SQLite tables.
    Import(ImportArgs),
}

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Route decoded elements through the table mapping and persist \
                 the resulting rows. Options can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Import decoded elements into SQLite"
)]
#[ortho_config(prefix = "TREKMAP")]
struct ImportArgs {
    /// JSON-lines file of decoded elements.
    #[arg(long = ARG_ELEMENTS, value_name = "path")]
    #[serde(default)]
    elements: Option<Utf8PathBuf>,
    /// SQLite database to write.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    output: Option<Utf8PathBuf>,
    /// Table mapping JSON; the built-in MapTrek mapping when omitted.
    #[arg(long = ARG_MAPPING, value_name = "path")]
    #[serde(default)]
    mapping: Option<Utf8PathBuf>,
    /// Table name prefix.
    #[arg(long, value_name = "prefix")]
    #[serde(default)]
    prefix: Option<String>,
    /// Ring classification strategy: `contains` or `union`.
    #[arg(long, value_name = "strategy")]
    #[serde(default)]
    strategy: Option<String>,
    /// Maximum rings per relation; 0 means unlimited.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    max_rings: Option<usize>,
    /// Import the resolvable rings of relations with dangling rings.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "bool")]
    #[serde(default)]
    partial: Option<bool>,
    /// Close chained rings whose open ends lie within this distance.
    #[arg(long, value_name = "distance")]
    #[serde(default)]
    snap_tolerance: Option<f64>,
    /// Split lines into pieces of at most this many vertices.
    #[arg(long, value_name = "vertices")]
    #[serde(default)]
    linestring_max_length: Option<usize>,
    /// Worker threads; 0 uses one per core.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    workers: Option<usize>,
    /// Elements per parallel batch.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    batch_size: Option<usize>,
}

impl ImportArgs {
    fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ImportConfig {
    elements: Utf8PathBuf,
    output: Utf8PathBuf,
    mapping: Option<Utf8PathBuf>,
    prefix: String,
    engine: EngineConfig,
}

impl ImportConfig {
    fn validate_sources(&self) -> Result<(), CliError> {
        require_file(&self.elements, ARG_ELEMENTS)?;
        if let Some(mapping) = &self.mapping {
            require_file(mapping, ARG_MAPPING)?;
        }
        if self.output.is_dir() {
            return Err(CliError::OutputIsDirectory {
                path: self.output.clone(),
            });
        }
        Ok(())
    }

    fn load_mapping(&self) -> Result<Mapping, CliError> {
        let Some(path) = &self.mapping else {
            return Ok(Mapping::maptrek());
        };
        let read_error = |source| CliError::ReadMapping {
            path: path.clone(),
            source,
        };
        let mut json = String::new();
        open_utf8_file(path)
            .and_then(|mut file| file.read_to_string(&mut json))
            .map_err(read_error)?;
        Mapping::from_json_str(&json).map_err(|source| CliError::InvalidMapping {
            path: path.clone(),
            source,
        })
    }
}

fn require_file(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_strategy(value: &str) -> Result<RingStrategy, CliError> {
    match value.to_ascii_lowercase().as_str() {
        "contains" => Ok(RingStrategy::Contains),
        "union" => Ok(RingStrategy::Union),
        _ => Err(CliError::UnknownStrategy {
            value: value.to_owned(),
        }),
    }
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let elements = args.elements.ok_or(CliError::MissingArgument {
            field: ARG_ELEMENTS,
            env: ENV_ELEMENTS,
        })?;
        let output = args.output.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT,
            env: ENV_OUTPUT,
        })?;

        let defaults = EngineConfig::default();
        let assembly = AssemblyConfig {
            strategy: args
                .strategy
                .as_deref()
                .map(parse_strategy)
                .transpose()?
                .unwrap_or(defaults.assembly.strategy),
            max_rings: args.max_rings.unwrap_or(defaults.assembly.max_rings),
            import_partial: args.partial.unwrap_or(defaults.assembly.import_partial),
            snap_tolerance: args
                .snap_tolerance
                .unwrap_or(defaults.assembly.snap_tolerance),
            ..defaults.assembly.clone()
        };
        let engine = EngineConfig {
            assembly,
            linestring_max_length: args
                .linestring_max_length
                .unwrap_or(defaults.linestring_max_length),
            workers: args.workers.unwrap_or(defaults.workers),
            batch_size: args.batch_size.unwrap_or(defaults.batch_size),
            ..defaults
        };

        Ok(Self {
            elements,
            output,
            mapping: args.mapping,
            prefix: args
                .prefix
                .unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_owned()),
            engine,
        })
    }
}

/// Result of a completed import.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct ImportOutcome {
    database: Utf8PathBuf,
    rows: u64,
    diagnostics: DiagnosticsSnapshot,
}

fn import(config: &ImportConfig) -> Result<ImportOutcome, CliError> {
    let mapping = config.load_mapping()?;
    let engine = Engine::new(mapping, config.engine.clone())?;
    let mut sink = SqliteSink::create(&config.output, engine.mapping(), &config.prefix).map_err(
        |source| CliError::PersistRows {
            path: config.output.clone(),
            source,
        },
    )?;
    let elements = read_elements(&config.elements)?;
    info!(
        "importing {} into {} with prefix {:?}",
        config.elements, config.output, config.prefix
    );
    let diagnostics = engine
        .run_parallel(elements, &mut sink)
        .map_err(|err| match err {
            RunError::Input(source) => CliError::ReadElements(source),
            RunError::Sink(source) => CliError::PersistRows {
                path: config.output.clone(),
                source,
            },
        })?;
    Ok(ImportOutcome {
        database: config.output.clone(),
        rows: sink.rows_written(),
        diagnostics,
    })
}

fn report(outcome: &ImportOutcome) -> Result<(), CliError> {
    let summary = serde_json::to_string(outcome).map_err(CliError::SerializeSummary)?;
    info!("import finished: {summary}");
    let skipped = outcome
        .diagnostics
        .relations_too_complex
        .saturating_add(outcome.diagnostics.relations_incomplete)
        .saturating_add(outcome.diagnostics.relations_timed_out);
    if skipped > 0 {
        warn!("{skipped} relations were skipped; see earlier warnings for their ids");
    }
    Ok(())
}

#[cfg(test)]
mod tests;
