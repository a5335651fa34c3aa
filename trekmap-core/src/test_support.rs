//! Test-only helpers: an in-memory sink and element builders used by unit
//! and behaviour tests.
#![expect(clippy::float_arithmetic, reason = "fixture geometry offsets")]

use std::convert::Infallible;

use geo::Coord;

use crate::element::{Element, Member, Role};
use crate::engine::RowSink;
use crate::value::Record;

/// In-memory [`RowSink`] keeping records in arrival order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<Record>,
    finished: bool,
}

impl MemorySink {
    /// All records received so far.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records routed to `table`.
    #[must_use]
    pub fn table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |record| record.table == table)
    }

    /// Whether [`RowSink::finish`] has been called.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }
}

impl RowSink for MemorySink {
    type Error = Infallible;

    fn write(&mut self, record: Record) -> Result<(), Self::Error> {
        self.records.push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        self.finished = true;
        Ok(())
    }
}

/// Closed square ring with its lower-left corner at `(min, min)`.
#[must_use]
pub fn square_ring(min: f64, size: f64) -> Vec<Coord<f64>> {
    let max = min + size;
    vec![
        Coord { x: min, y: min },
        Coord { x: max, y: min },
        Coord { x: max, y: max },
        Coord { x: min, y: max },
        Coord { x: min, y: min },
    ]
}

/// A square member way.
#[must_use]
pub fn square_member(way_id: i64, role: Option<Role>, min: f64, size: f64) -> Member {
    Member::new(way_id, role, square_ring(min, size))
}

/// A multipolygon relation with the given members and extra tags.
#[must_use]
pub fn multipolygon(id: i64, members: Vec<Member>, tags: &[(&str, &str)]) -> Element {
    let mut element = Element::relation(id, members, tags.iter().copied());
    element
        .tags
        .insert("type".to_owned(), "multipolygon".to_owned());
    element
}
