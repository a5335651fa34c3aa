//! Test helpers for composing element files and mapping files on disk.

use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

const CAFE: &str =
    r#"{"id":1,"tags":{"amenity":"cafe","name":"Corner"},"geometry":{"kind":"point","data":{"x":1.0,"y":2.0}}}"#;
const ROAD: &str = r#"{"id":2,"tags":{"highway":"secondary","bridge":"yes"},"geometry":{"kind":"way","data":[{"x":0.0,"y":0.0},{"x":5.0,"y":0.0},{"x":9.0,"y":0.0}]}}"#;
const LAKE: &str = r#"{"id":3,"tags":{"type":"multipolygon","natural":"water"},"geometry":{"kind":"relation","data":[{"way_id":30,"role":"outer","coords":[{"x":0.0,"y":0.0},{"x":10.0,"y":0.0},{"x":10.0,"y":10.0},{"x":0.0,"y":10.0},{"x":0.0,"y":0.0}]}]}}"#;
const BROKEN_LAKE: &str = r#"{"id":4,"tags":{"type":"multipolygon","natural":"water"},"geometry":{"kind":"relation","data":[{"way_id":40,"role":"outer","coords":[{"x":20.0,"y":0.0},{"x":30.0,"y":0.0},{"x":30.0,"y":10.0}]}]}}"#;

pub(super) const CAFES_ONLY_MAPPING: &str = r#"{"tables":[{"name":"cafes","geometry":"point","fields":[{"column":"name","codec":{"kind":"name"}}],"mapping":[{"key":"amenity","values":["cafe"]}]}]}"#;

/// Temporary workspace holding the inputs of one import.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Write a stream with a cafe, a bridge road, a lake and a relation
    /// whose outer ring never closes.
    pub(super) fn write_elements(&self) -> Utf8PathBuf {
        let path = self.path("elements.jsonl");
        let body = [CAFE, ROAD, LAKE, BROKEN_LAKE].join("\n");
        fs::write(&path, body).expect("write elements");
        path
    }

    pub(super) fn write_mapping(&self, json: &str) -> Utf8PathBuf {
        let path = self.path("mapping.json");
        fs::write(&path, json).expect("write mapping");
        path
    }
}

pub(super) fn import_args(elements: Utf8PathBuf, output: Utf8PathBuf) -> super::ImportArgs {
    super::ImportArgs {
        elements: Some(elements),
        output: Some(output),
        ..super::ImportArgs::default()
    }
}
