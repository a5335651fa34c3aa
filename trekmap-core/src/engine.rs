//! Streaming import driver.
//!
//! [`Engine`] pulls decoded elements from an iterator, builds their records
//! and hands them to a [`RowSink`]. The parallel driver processes fixed-size
//! batches on a bounded rayon pool and writes each batch back in input order,
//! so sequential and parallel runs produce identical output.

use std::sync::Arc;

use log::info;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assemble::AssemblyConfig;
use crate::build::RowBuilder;
use crate::codec::Transliterator;
use crate::derived::Projection;
use crate::diagnostics::DiagnosticsSnapshot;
use crate::element::Element;
use crate::mapping::Mapping;
use crate::value::Record;

/// Elements per parallel batch when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Engine settings, passed explicitly for the duration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Relation assembly settings.
    pub assembly: AssemblyConfig,
    /// Projection of the incoming coordinates.
    pub projection: Projection,
    /// Split lines into pieces of at most this many vertices; `0` disables.
    pub linestring_max_length: usize,
    /// Worker threads for [`Engine::run_parallel`]; `0` uses one per core.
    pub workers: usize,
    /// Elements per parallel batch.
    pub batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assembly: AssemblyConfig::default(),
            projection: Projection::default(),
            linestring_max_length: 0,
            workers: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Destination of built records.
///
/// Implementations receive records in a deterministic order: input order,
/// then table declaration order within one element.
pub trait RowSink {
    /// Error raised by the underlying store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist one record.
    fn write(&mut self, record: Record) -> Result<(), Self::Error>;

    /// Flush buffered records. Called once at the end of a run.
    fn finish(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl RowSink for Vec<Record> {
    type Error = std::convert::Infallible;

    fn write(&mut self, record: Record) -> Result<(), Self::Error> {
        self.push(record);
        Ok(())
    }
}

/// Errors raised while constructing an [`Engine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The worker pool could not be created.
    #[error("failed to build worker pool")]
    WorkerPool(#[from] ThreadPoolBuildError),
}

/// Errors that stop a run: only input decoding and sink I/O qualify.
#[derive(Debug, Error)]
pub enum RunError<I, S>
where
    I: std::error::Error + 'static,
    S: std::error::Error + 'static,
{
    /// The element stream yielded an error.
    #[error("failed to read input elements")]
    Input(#[source] I),
    /// The sink rejected a record.
    #[error("failed to write records")]
    Sink(#[source] S),
}

/// Drives elements through a [`RowBuilder`] into a [`RowSink`].
///
/// # Examples
/// ```
/// use std::convert::Infallible;
/// use geo::Coord;
/// use trekmap_core::{Element, Engine, EngineConfig, Mapping, Record};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Engine::new(Mapping::maptrek(), EngineConfig::default())?;
/// let elements = vec![Element::node(1, Coord { x: 0.0, y: 0.0 }, [("amenity", "cafe")])];
/// let mut sink: Vec<Record> = Vec::new();
/// engine.run(elements.into_iter().map(Ok::<_, Infallible>), &mut sink)?;
/// assert_eq!(sink.len(), 1);
/// assert_eq!(engine.diagnostics().records, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Engine {
    builder: RowBuilder,
    pool: ThreadPool,
    batch_size: usize,
}

impl Engine {
    /// Validate settings and start the worker pool.
    ///
    /// # Errors
    /// Returns [`EngineError::WorkerPool`] when the pool cannot be created.
    pub fn new(mapping: Mapping, config: EngineConfig) -> Result<Self, EngineError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|index| format!("trekmap-worker-{index}"))
            .build()?;
        Ok(Self {
            builder: RowBuilder::new(mapping, &config),
            pool,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Use `transliterator` for localized-name fallbacks.
    #[must_use]
    pub fn with_transliterator(mut self, transliterator: Arc<dyn Transliterator>) -> Self {
        self.builder = self.builder.with_transliterator(transliterator);
        self
    }

    /// The active mapping.
    #[must_use]
    pub const fn mapping(&self) -> &Mapping {
        self.builder.mapping()
    }

    /// Build the records of a single element.
    #[must_use]
    pub fn process(&self, element: &Element) -> Vec<Record> {
        self.builder.build(element)
    }

    /// Process `elements` one at a time on the calling thread.
    ///
    /// # Errors
    /// Stops at the first input or sink error.
    pub fn run<I, E, S>(
        &self,
        elements: I,
        sink: &mut S,
    ) -> Result<DiagnosticsSnapshot, RunError<E, S::Error>>
    where
        I: IntoIterator<Item = Result<Element, E>>,
        E: std::error::Error + 'static,
        S: RowSink,
    {
        for item in elements {
            let element = item.map_err(RunError::Input)?;
            write_all(sink, self.builder.build(&element))?;
        }
        self.finish(sink)
    }

    /// Process `elements` in batches on the worker pool.
    ///
    /// Batches are written in input order, so the sink sees exactly what
    /// [`Engine::run`] would have produced.
    ///
    /// # Errors
    /// Stops at the first input or sink error.
    pub fn run_parallel<I, E, S>(
        &self,
        elements: I,
        sink: &mut S,
    ) -> Result<DiagnosticsSnapshot, RunError<E, S::Error>>
    where
        I: IntoIterator<Item = Result<Element, E>>,
        E: std::error::Error + 'static,
        S: RowSink,
    {
        let mut batch = Vec::with_capacity(self.batch_size);
        for item in elements {
            batch.push(item.map_err(RunError::Input)?);
            if batch.len() >= self.batch_size {
                self.flush_batch(&mut batch, sink)?;
            }
        }
        self.flush_batch(&mut batch, sink)?;
        self.finish(sink)
    }

    /// Totals accumulated by this engine so far.
    #[must_use]
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.builder.diagnostics().snapshot()
    }

    fn flush_batch<E, S>(
        &self,
        batch: &mut Vec<Element>,
        sink: &mut S,
    ) -> Result<(), RunError<E, S::Error>>
    where
        E: std::error::Error + 'static,
        S: RowSink,
    {
        if batch.is_empty() {
            return Ok(());
        }
        let built: Vec<Vec<Record>> = self.pool.install(|| {
            batch
                .par_iter()
                .map(|element| self.builder.build(element))
                .collect()
        });
        batch.clear();
        write_all(sink, built.into_iter().flatten())
    }

    fn finish<E, S>(&self, sink: &mut S) -> Result<DiagnosticsSnapshot, RunError<E, S::Error>>
    where
        E: std::error::Error + 'static,
        S: RowSink,
    {
        sink.finish().map_err(RunError::Sink)?;
        let totals = self.diagnostics();
        info!(
            "processed {} elements into {} records",
            totals.elements, totals.records
        );
        Ok(totals)
    }
}

fn write_all<E, S>(
    sink: &mut S,
    records: impl IntoIterator<Item = Record>,
) -> Result<(), RunError<E, S::Error>>
where
    E: std::error::Error + 'static,
    S: RowSink,
{
    for record in records {
        sink.write(record).map_err(RunError::Sink)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::{fixture, rstest};
    use std::convert::Infallible;
    use std::io;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn stream(elements: Vec<Element>) -> impl Iterator<Item = Result<Element, Infallible>> {
        elements.into_iter().map(Ok)
    }

    fn sample() -> Vec<Element> {
        (0..50_i32)
            .map(|index| {
                let x = f64::from(index);
                match index.rem_euclid(3) {
                    0 => Element::node(i64::from(index), c(x, 0.0), [("amenity", "cafe")]),
                    1 => Element::way(
                        i64::from(index),
                        vec![c(x, 0.0), c(x, 1.0)],
                        [("highway", "primary"), ("layer", "1")],
                    ),
                    _ => Element::node(i64::from(index), c(x, 0.0), [("place", "village")]),
                }
            })
            .collect()
    }

    #[fixture]
    fn engine() -> Engine {
        let config = EngineConfig {
            workers: 2,
            batch_size: 7,
            ..EngineConfig::default()
        };
        Engine::new(Mapping::maptrek(), config).expect("pool starts")
    }

    #[rstest]
    fn parallel_runs_match_sequential_runs(engine: Engine) {
        let mut sequential: Vec<Record> = Vec::new();
        engine
            .run(stream(sample()), &mut sequential)
            .expect("in-memory run");
        let mut parallel: Vec<Record> = Vec::new();
        engine
            .run_parallel(stream(sample()), &mut parallel)
            .expect("in-memory run");
        assert_eq!(sequential, parallel);
        assert!(!sequential.is_empty());
    }

    #[rstest]
    fn diagnostics_accumulate_across_runs(engine: Engine) {
        let mut sink: Vec<Record> = Vec::new();
        let first = engine.run(stream(sample()), &mut sink).expect("run");
        assert_eq!(first.elements, 50);
        let second = engine.run_parallel(stream(sample()), &mut sink).expect("run");
        assert_eq!(second.elements, 100);
        assert_eq!(
            second.records,
            u64::try_from(sink.len()).expect("fits in u64")
        );
    }

    #[rstest]
    fn input_errors_stop_the_run(engine: Engine) {
        let elements = vec![
            Ok(Element::node(1, c(0.0, 0.0), [("amenity", "cafe")])),
            Err(io::Error::other("truncated input")),
            Ok(Element::node(2, c(0.0, 0.0), [("amenity", "cafe")])),
        ];
        let mut sink: Vec<Record> = Vec::new();
        let err = engine
            .run(elements, &mut sink)
            .expect_err("input error surfaces");
        assert!(matches!(err, RunError::Input(_)));
        assert_eq!(sink.len(), 1);
    }

    struct RejectingSink;

    impl RowSink for RejectingSink {
        type Error = io::Error;

        fn write(&mut self, _record: Record) -> Result<(), Self::Error> {
            Err(io::Error::other("disk full"))
        }
    }

    #[rstest]
    fn sink_errors_stop_the_run(engine: Engine) {
        let err = engine
            .run_parallel(stream(sample()), &mut RejectingSink)
            .expect_err("sink error surfaces");
        assert!(matches!(err, RunError::Sink(_)));
    }

    #[rstest]
    fn zero_batch_size_is_clamped() {
        let config = EngineConfig {
            batch_size: 0,
            workers: 1,
            ..EngineConfig::default()
        };
        let engine = Engine::new(Mapping::maptrek(), config).expect("pool starts");
        let mut sink: Vec<Record> = Vec::new();
        engine
            .run_parallel(stream(sample()), &mut sink)
            .expect("in-memory run");
        assert!(!sink.is_empty());
    }
}
