//! SQLite persistence for mapped rows.
//!
//! [`SqliteSink`] creates one table per mapping table, named with a
//! configurable prefix, and writes every record inside a single transaction
//! that is committed by [`RowSink::finish`]. A sink dropped before `finish`
//! leaves the database without the partially written rows.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use rusqlite::{Connection, Error as SqliteError, params_from_iter, types::Value as SqlValue};
use thiserror::Error;
use trekmap_core::{
    GEOMETRY_COLUMN, LABEL_COLUMN, Mapping, OSM_ID_COLUMN, Record, RowSink, TYPE_COLUMN,
    TableDefinition, Value,
};

use crate::fs::ensure_parent_dir;

/// Table name prefix used when none is configured.
pub const DEFAULT_TABLE_PREFIX: &str = "osm_new_";

/// Errors raised when persisting rows to SQLite.
#[derive(Debug, Error)]
pub enum PersistRowsError {
    /// Failed to create the parent directory for the database.
    #[error("failed to create parent directory {path:?}")]
    CreateDirectory {
        /// Path of the database whose parent could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Destination database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Beginning the transaction failed.
    #[error("failed to begin row persistence transaction")]
    BeginTransaction {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating a destination table failed.
    #[error("failed to create table {table}")]
    CreateSchema {
        /// Prefixed table name.
        table: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A record named a table that the mapping does not declare.
    #[error("record for {osm_id} targets undeclared table {table}")]
    UnknownTable {
        /// Unprefixed table name carried by the record.
        table: String,
        /// Identifier of the offending record.
        osm_id: i64,
    },
    /// Serialising a geometry to JSON failed.
    #[error("failed to serialise geometry of {osm_id} for {table}")]
    SerializeGeometry {
        /// Unprefixed table name.
        table: String,
        /// Identifier of the record.
        osm_id: i64,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// Writing a row failed.
    #[error("failed to persist {osm_id} into {table}")]
    PersistRow {
        /// Unprefixed table name.
        table: String,
        /// Identifier of the record.
        osm_id: i64,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Committing the transaction failed.
    #[error("failed to commit row persistence transaction")]
    Commit {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Insert statement and column list for one destination table.
#[derive(Debug)]
struct TableWriter {
    insert: String,
    columns: Vec<String>,
    with_label: bool,
}

impl TableWriter {
    fn new(table: &TableDefinition, prefixed: &str) -> Self {
        let mut columns = Vec::new();
        if table.with_type_field {
            columns.push(TYPE_COLUMN.to_owned());
        }
        columns.extend(table.fields.iter().map(|field| field.column.clone()));

        let mut names = vec![quote(OSM_ID_COLUMN)];
        names.extend(columns.iter().map(|column| quote(column)));
        names.push(quote(GEOMETRY_COLUMN));
        if table.with_label_field {
            names.push(quote(LABEL_COLUMN));
        }
        let placeholders: Vec<String> = (1..=names.len()).map(|index| format!("?{index}")).collect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(prefixed),
            names.join(", "),
            placeholders.join(", ")
        );
        Self {
            insert,
            columns,
            with_label: table.with_label_field,
        }
    }
}

/// [`RowSink`] writing records into a SQLite database.
///
/// Geometries and label points are stored as JSON text. Absent values are
/// stored as `NULL` and booleans as `0`/`1`.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use trekmap_core::{Mapping, RowSink};
/// use trekmap_data::{DEFAULT_TABLE_PREFIX, SqliteSink};
///
/// # fn main() -> Result<(), trekmap_data::PersistRowsError> {
/// let mapping = Mapping::maptrek();
/// let mut sink = SqliteSink::create(Utf8Path::new("out/rows.db"), &mapping, DEFAULT_TABLE_PREFIX)?;
/// sink.finish()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteSink {
    connection: Connection,
    path: Utf8PathBuf,
    tables: HashMap<String, TableWriter>,
    written: u64,
    finished: bool,
}

impl SqliteSink {
    /// Open (or create) the database at `path` and recreate one table per
    /// mapping table named `{prefix}{table}`.
    ///
    /// Parent directories are created automatically. Existing tables with
    /// the same names are dropped so each import starts from empty tables.
    pub fn create(
        path: &Utf8Path,
        mapping: &Mapping,
        prefix: &str,
    ) -> Result<Self, PersistRowsError> {
        ensure_parent_dir(path).map_err(|source| PersistRowsError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| PersistRowsError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        connection
            .execute_batch("BEGIN")
            .map_err(|source| PersistRowsError::BeginTransaction { source })?;

        let mut tables = HashMap::new();
        for table in mapping.tables() {
            let prefixed = format!("{prefix}{}", table.name);
            create_table(&connection, table, &prefixed)?;
            tables.insert(table.name.clone(), TableWriter::new(table, &prefixed));
        }

        Ok(Self {
            connection,
            path: path.to_path_buf(),
            tables,
            written: 0,
            finished: false,
        })
    }

    /// Number of rows written so far.
    #[must_use]
    pub const fn rows_written(&self) -> u64 {
        self.written
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl RowSink for SqliteSink {
    type Error = PersistRowsError;

    fn write(&mut self, record: Record) -> Result<(), Self::Error> {
        let writer = self
            .tables
            .get(&record.table)
            .ok_or_else(|| PersistRowsError::UnknownTable {
                table: record.table.clone(),
                osm_id: record.osm_id,
            })?;

        let mut params = Vec::with_capacity(writer.columns.len().saturating_add(3));
        params.push(SqlValue::Integer(record.osm_id));
        params.extend(
            writer
                .columns
                .iter()
                .map(|column| record.row.get(column).map_or(SqlValue::Null, to_sql)),
        );
        params.push(SqlValue::Text(serialise(&record, &record.geometry)?));
        if writer.with_label {
            let label = record
                .label_point
                .as_ref()
                .map(|point| serialise(&record, point))
                .transpose()?;
            params.push(label.map_or(SqlValue::Null, SqlValue::Text));
        }

        let mut statement = self
            .connection
            .prepare_cached(&writer.insert)
            .map_err(|source| persist_error(&record, source))?;
        statement
            .execute(params_from_iter(params))
            .map_err(|source| persist_error(&record, source))?;
        self.written = self.written.saturating_add(1);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        if self.finished {
            return Ok(());
        }
        self.connection
            .execute_batch("COMMIT")
            .map_err(|source| PersistRowsError::Commit { source })?;
        self.finished = true;
        info!(
            "committed {} rows across {} tables to {}",
            self.written,
            self.tables.len(),
            self.path
        );
        Ok(())
    }
}

fn create_table(
    connection: &Connection,
    table: &TableDefinition,
    prefixed: &str,
) -> Result<(), PersistRowsError> {
    let mut columns = vec![format!("{} INTEGER NOT NULL", quote(OSM_ID_COLUMN))];
    if table.with_type_field {
        columns.push(format!("{} TEXT", quote(TYPE_COLUMN)));
    }
    columns.extend(table.fields.iter().map(|field| {
        format!(
            "{} {}",
            quote(&field.column),
            field.codec.column_type().sql_name()
        )
    }));
    columns.push(format!("{} TEXT NOT NULL", quote(GEOMETRY_COLUMN)));
    if table.with_label_field {
        columns.push(format!("{} TEXT", quote(LABEL_COLUMN)));
    }

    let name = quote(prefixed);
    let ddl = format!(
        "DROP TABLE IF EXISTS {name};\nCREATE TABLE {name} (\n    {}\n);",
        columns.join(",\n    ")
    );
    connection
        .execute_batch(&ddl)
        .map_err(|source| PersistRowsError::CreateSchema {
            table: prefixed.to_owned(),
            source,
        })
}

/// Quote an SQL identifier; column names such as `name:en` need it.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Integer(number) => SqlValue::Integer(*number),
        Value::Real(number) => SqlValue::Real(*number),
        Value::Text(text) => SqlValue::Text(text.clone()),
    }
}

fn serialise<T: serde::Serialize>(record: &Record, value: &T) -> Result<String, PersistRowsError> {
    serde_json::to_string(value).map_err(|source| PersistRowsError::SerializeGeometry {
        table: record.table.clone(),
        osm_id: record.osm_id,
        source,
    })
}

fn persist_error(record: &Record, source: SqliteError) -> PersistRowsError {
    PersistRowsError::PersistRow {
        table: record.table.clone(),
        osm_id: record.osm_id,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, Point};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;
    use trekmap_core::{Codec, FieldDeclaration, GeometryCategory, Row};

    fn mapping() -> Mapping {
        Mapping::new(vec![
            TableDefinition::new("roads", GeometryCategory::Line)
                .with_fields([
                    FieldDeclaration::new("name:en", Codec::String),
                    FieldDeclaration::new("bridge", Codec::Bool),
                    FieldDeclaration::new("layer", Codec::Integer),
                ])
                .with_rule("highway", &["primary"]),
            TableDefinition::new("lakes", GeometryCategory::Polygon)
                .without_type_field()
                .with_label_field()
                .with_rule("natural", &["water"]),
        ])
        .expect("valid mapping")
    }

    fn road(osm_id: i64) -> Record {
        let mut row = Row::default();
        row.push(TYPE_COLUMN, Some(Value::from("primary")));
        row.push("name:en", Some(Value::from("High Street")));
        row.push("bridge", Some(Value::Bool(true)));
        row.push("layer", None);
        Record {
            table: "roads".to_owned(),
            osm_id,
            row,
            geometry: Geometry::Point(Point::new(1.0, 2.0)),
            label_point: None,
        }
    }

    #[fixture]
    fn database() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/rows.db")).expect("utf-8 path");
        (dir, path)
    }

    #[rstest]
    fn writes_prefixed_typed_rows(database: (TempDir, Utf8PathBuf)) {
        let (_guard, path) = database;
        let mut sink = SqliteSink::create(&path, &mapping(), DEFAULT_TABLE_PREFIX).expect("create sink");
        sink.write(road(5)).expect("write row");
        sink.finish().expect("commit");
        assert_eq!(sink.rows_written(), 1);

        let conn = Connection::open(path.as_std_path()).expect("open database");
        let stored: (i64, String, String, i64, Option<i64>, String) = conn
            .query_row(
                "SELECT osm_id, type, \"name:en\", bridge, layer, geometry FROM osm_new_roads",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .expect("read row");
        assert_eq!(stored.0, 5);
        assert_eq!(stored.1, "primary");
        assert_eq!(stored.2, "High Street");
        assert_eq!(stored.3, 1);
        assert_eq!(stored.4, None);
        assert!(stored.5.contains("1.0"));
    }

    #[rstest]
    fn label_column_stores_point(database: (TempDir, Utf8PathBuf)) {
        let (_guard, path) = database;
        let mut sink = SqliteSink::create(&path, &mapping(), "t_").expect("create sink");
        let record = Record {
            table: "lakes".to_owned(),
            osm_id: -9,
            row: Row::default(),
            geometry: Geometry::Point(Point::new(0.0, 0.0)),
            label_point: Some(Point::new(3.0, 4.0)),
        };
        sink.write(record).expect("write row");
        sink.finish().expect("commit");

        let conn = Connection::open(path.as_std_path()).expect("open database");
        let (osm_id, label): (i64, String) = conn
            .query_row("SELECT osm_id, label FROM t_lakes", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .expect("read row");
        assert_eq!(osm_id, -9);
        assert!(label.contains("3.0"));
    }

    #[rstest]
    fn rejects_undeclared_table(database: (TempDir, Utf8PathBuf)) {
        let (_guard, path) = database;
        let mut sink = SqliteSink::create(&path, &mapping(), DEFAULT_TABLE_PREFIX).expect("create sink");
        let mut record = road(1);
        record.table = "rivers".to_owned();
        let err = sink.write(record).expect_err("unknown table");
        assert!(matches!(err, PersistRowsError::UnknownTable { osm_id: 1, .. }));
    }

    #[rstest]
    fn unfinished_sink_rolls_back(database: (TempDir, Utf8PathBuf)) {
        let (_guard, path) = database;
        {
            let mut sink = SqliteSink::create(&path, &mapping(), DEFAULT_TABLE_PREFIX).expect("create sink");
            sink.write(road(1)).expect("write row");
        }
        let conn = Connection::open(path.as_std_path()).expect("open database");
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'osm_new_roads'",
                [],
                |row| row.get(0),
            )
            .expect("inspect schema");
        assert_eq!(tables, 0);
    }

    #[rstest]
    fn recreating_starts_from_empty_tables(database: (TempDir, Utf8PathBuf)) {
        let (_guard, path) = database;
        for _ in 0..2 {
            let mut sink = SqliteSink::create(&path, &mapping(), DEFAULT_TABLE_PREFIX).expect("create sink");
            sink.write(road(1)).expect("write row");
            sink.finish().expect("commit");
        }
        let conn = Connection::open(path.as_std_path()).expect("open database");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM osm_new_roads", [], |row| row.get(0))
            .expect("count rows");
        assert_eq!(count, 1);
    }
}
