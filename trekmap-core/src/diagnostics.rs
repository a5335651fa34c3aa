//! Import counters shared between worker threads.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::assemble::{AssemblyError, AssemblyReport};

/// Running totals for one import.
///
/// Counters use relaxed atomics: each is independent and only read once the
/// workers are done.
#[derive(Debug, Default)]
pub struct Diagnostics {
    elements: AtomicU64,
    records: AtomicU64,
    rows_filtered: AtomicU64,
    classification_misses: AtomicU64,
    field_failures: AtomicU64,
    relations_assembled: AtomicU64,
    relations_too_complex: AtomicU64,
    relations_incomplete: AtomicU64,
    relations_timed_out: AtomicU64,
    dangling_rings: AtomicU64,
    dropped_inner_rings: AtomicU64,
    repaired_polygons: AtomicU64,
    discarded_rings: AtomicU64,
}

/// A point-in-time copy of [`Diagnostics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiagnosticsSnapshot {
    /// Elements processed.
    pub elements: u64,
    /// Records emitted.
    pub records: u64,
    /// Table matches excluded by a field filter.
    pub rows_filtered: u64,
    /// Element and table pairs with no matching rule.
    pub classification_misses: u64,
    /// Present tag values a codec could not convert.
    pub field_failures: u64,
    /// Relations that produced geometry.
    pub relations_assembled: u64,
    /// Relations rejected by the ring ceiling.
    pub relations_too_complex: u64,
    /// Relations dropped for dangling rings.
    pub relations_incomplete: u64,
    /// Relations abandoned after the assembly timeout.
    pub relations_timed_out: u64,
    /// Rings that could not be closed.
    pub dangling_rings: u64,
    /// Inner rings without an enclosing outer ring.
    pub dropped_inner_rings: u64,
    /// Polygons that needed repair.
    pub repaired_polygons: u64,
    /// Rings discarded during repair.
    pub discarded_rings: u64,
}

fn bump(counter: &AtomicU64, by: usize) {
    counter.fetch_add(u64::try_from(by).unwrap_or(u64::MAX), Ordering::Relaxed);
}

impl Diagnostics {
    pub(crate) fn element_processed(&self, records: usize) {
        bump(&self.elements, 1);
        bump(&self.records, records);
    }

    pub(crate) fn unmatched(&self) {
        bump(&self.classification_misses, 1);
    }

    pub(crate) fn filtered(&self) {
        bump(&self.rows_filtered, 1);
    }

    pub(crate) fn field_failed(&self) {
        bump(&self.field_failures, 1);
    }

    pub(crate) fn assembled(&self, report: &AssemblyReport) {
        bump(&self.relations_assembled, 1);
        bump(&self.dangling_rings, report.dangling_rings);
        bump(&self.dropped_inner_rings, report.dropped_inner_rings);
        bump(&self.repaired_polygons, report.repaired_polygons);
        bump(&self.discarded_rings, report.discarded_rings);
    }

    pub(crate) fn assembly_failed(&self, error: &AssemblyError) {
        match error {
            AssemblyError::TooComplex { .. } => bump(&self.relations_too_complex, 1),
            AssemblyError::Incomplete { dangling, .. } => {
                bump(&self.relations_incomplete, 1);
                bump(&self.dangling_rings, *dangling);
            }
            AssemblyError::TimedOut { .. } => bump(&self.relations_timed_out, 1),
        }
    }

    /// Copy the current totals.
    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        DiagnosticsSnapshot {
            elements: read(&self.elements),
            records: read(&self.records),
            rows_filtered: read(&self.rows_filtered),
            classification_misses: read(&self.classification_misses),
            field_failures: read(&self.field_failures),
            relations_assembled: read(&self.relations_assembled),
            relations_too_complex: read(&self.relations_too_complex),
            relations_incomplete: read(&self.relations_incomplete),
            relations_timed_out: read(&self.relations_timed_out),
            dangling_rings: read(&self.dangling_rings),
            dropped_inner_rings: read(&self.dropped_inner_rings),
            repaired_polygons: read(&self.repaired_polygons),
            discarded_rings: read(&self.discarded_rings),
        }
    }
}
