//! Multipolygon relation assembly.
//!
//! [`RelationAssembler`] turns the member ways of an area relation into valid
//! polygons. Open ways are chained into rings, rings are classified as outer
//! or inner boundaries, inner rings are attached to the smallest enclosing
//! outer ring and each resulting polygon is repaired when invalid. Every
//! failure is local to one relation.

mod chain;
mod repair;

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use geo::{Area, BooleanOps, Contains, Geometry, LineString, MultiPolygon, Polygon, Relate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::{Member, Role};
use chain::{ChainedRing, DeadlineExceeded, chain_rings};
pub use repair::repair_polygon;

/// How rings are classified as outer or inner boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingStrategy {
    /// Trust member roles. Overlapping outer rings are merged; rings without
    /// a role are classified by containment.
    Union,
    /// Ignore roles and classify rings by nesting depth: rings inside an odd
    /// number of other rings are holes.
    #[default]
    Contains,
}

/// Tuning knobs for relation assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Ring classification strategy.
    pub strategy: RingStrategy,
    /// Maximum number of rings per relation; `0` means unlimited.
    pub max_rings: usize,
    /// Keep the closed rings of relations that also have dangling rings.
    pub import_partial: bool,
    /// Close rings whose end points lie within this distance; `0` disables.
    pub snap_tolerance: f64,
    /// Abandon relations that take longer than this to chain.
    pub timeout: Option<Duration>,
    /// Log relations that take longer than this to assemble.
    pub report_after: Option<Duration>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            strategy: RingStrategy::default(),
            max_rings: 0,
            import_partial: false,
            snap_tolerance: 0.0,
            timeout: None,
            report_after: Some(Duration::from_secs(60)),
        }
    }
}

/// Counters describing what assembly did to one relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblyReport {
    /// Rings that could not be closed.
    pub dangling_rings: usize,
    /// Inner rings with no enclosing outer ring.
    pub dropped_inner_rings: usize,
    /// Polygons that needed repair.
    pub repaired_polygons: usize,
    /// Rings or polygons discarded because they collapsed to zero area.
    pub discarded_rings: usize,
}

/// Polygons assembled from one relation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assembly {
    /// Valid polygons, largest first.
    pub polygons: Vec<Polygon<f64>>,
    /// What happened along the way.
    pub report: AssemblyReport,
}

impl Assembly {
    /// The assembled geometry: nothing, one polygon or a multipolygon.
    #[must_use]
    pub fn geometry(&self) -> Option<Geometry<f64>> {
        match self.polygons.as_slice() {
            [] => None,
            [single] => Some(Geometry::Polygon(single.clone())),
            many => Some(Geometry::MultiPolygon(MultiPolygon::new(many.to_vec()))),
        }
    }
}

/// Reasons a relation yields no geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// The relation has more rings than the configured ceiling.
    #[error("relation {relation} has {rings} rings, more than the limit of {limit}")]
    TooComplex {
        /// Relation identifier.
        relation: i64,
        /// Rings found after chaining.
        rings: usize,
        /// Configured ceiling.
        limit: usize,
    },
    /// Some member ways could not be chained into closed rings.
    #[error("relation {relation} has {dangling} unclosed rings")]
    Incomplete {
        /// Relation identifier.
        relation: i64,
        /// Number of dangling rings.
        dangling: usize,
    },
    /// Chaining exceeded the configured timeout.
    #[error("relation {relation} timed out after {elapsed:?}")]
    TimedOut {
        /// Relation identifier.
        relation: i64,
        /// Time spent before giving up.
        elapsed: Duration,
    },
}

/// A closed ring with its cached polygon form and area.
///
/// The polygon only carries interiors when repair or outer merging produced
/// them; those holes travel with the ring into its shell.
#[derive(Debug, Clone)]
struct Ring {
    polygon: Polygon<f64>,
    area: f64,
    role: Option<Role>,
}

impl Ring {
    fn new(polygon: Polygon<f64>, role: Option<Role>) -> Self {
        let area = polygon.unsigned_area();
        Self {
            polygon,
            area,
            role,
        }
    }

    fn contains(&self, other: &Self) -> bool {
        self.area > other.area && self.polygon.contains(&other.polygon)
    }

    fn exterior(&self) -> LineString<f64> {
        self.polygon.exterior().clone()
    }

    fn shell(&self) -> Shell {
        Shell {
            outer: self.exterior(),
            holes: self.polygon.interiors().to_vec(),
        }
    }
}

fn by_area_descending(left: &Ring, right: &Ring) -> Ordering {
    right.area.total_cmp(&left.area)
}

/// Builds polygons from area relations.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use trekmap_core::{AssemblyConfig, Member, RelationAssembler, Role};
///
/// let c = |x: f64, y: f64| Coord { x, y };
/// let members = vec![
///     Member::new(1, Some(Role::Outer), vec![c(0.0, 0.0), c(10.0, 0.0), c(10.0, 10.0)]),
///     Member::new(2, Some(Role::Outer), vec![c(10.0, 10.0), c(0.0, 10.0), c(0.0, 0.0)]),
/// ];
/// let assembler = RelationAssembler::new(AssemblyConfig::default());
/// let assembly = assembler.assemble(7, &members).expect("closed ring");
/// assert_eq!(assembly.polygons.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RelationAssembler {
    config: AssemblyConfig,
}

impl RelationAssembler {
    /// Create an assembler with the given configuration.
    #[must_use]
    pub const fn new(config: AssemblyConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Assemble the member ways of relation `relation` into polygons.
    ///
    /// Members without usable coordinates are ignored. The result may hold no
    /// polygons when every ring collapses during repair.
    ///
    /// # Errors
    /// Returns [`AssemblyError`] when the relation exceeds the ring ceiling,
    /// has dangling rings and partial import is off, or times out.
    pub fn assemble(&self, relation: i64, members: &[Member]) -> Result<Assembly, AssemblyError> {
        let started = Instant::now();
        let outcome = self.assemble_inner(relation, members, started);
        if let Some(threshold) = self.config.report_after {
            let elapsed = started.elapsed();
            if elapsed > threshold {
                warn!(
                    "relation {relation} with {} members took {elapsed:?} to assemble",
                    members.len()
                );
            }
        }
        outcome
    }

    fn assemble_inner(
        &self,
        relation: i64,
        members: &[Member],
        started: Instant,
    ) -> Result<Assembly, AssemblyError> {
        let deadline = self.config.timeout.map(|timeout| started + timeout);
        let chained = self.chain(members, deadline).map_err(|DeadlineExceeded| {
            let elapsed = started.elapsed();
            warn!("relation {relation} timed out after {elapsed:?}, skipping");
            AssemblyError::TimedOut { relation, elapsed }
        })?;

        let limit = self.config.max_rings;
        if limit > 0 && chained.len() > limit {
            warn!(
                "relation {relation} is too complex: {} rings exceed the limit of {limit}",
                chained.len()
            );
            return Err(AssemblyError::TooComplex {
                relation,
                rings: chained.len(),
                limit,
            });
        }

        let mut report = AssemblyReport::default();
        let (closed, dangling): (Vec<ChainedRing>, Vec<ChainedRing>) =
            chained.into_iter().partition(ChainedRing::is_closed);
        report.dangling_rings = dangling.len();
        for ring in &dangling {
            warn!(
                "relation {relation}: ring starting at way {} is not closed",
                ring.first_way
            );
        }
        if !dangling.is_empty() && !self.config.import_partial {
            return Err(AssemblyError::Incomplete {
                relation,
                dangling: dangling.len(),
            });
        }

        let rings = clean_rings(closed, &mut report);
        let shells = match self.config.strategy {
            RingStrategy::Contains => nest_by_containment(rings),
            RingStrategy::Union => nest_by_role(relation, rings, &mut report),
        };
        let mut polygons = finish_polygons(shells, &mut report);
        polygons.sort_by(|left, right| right.unsigned_area().total_cmp(&left.unsigned_area()));
        debug!(
            "relation {relation} assembled into {} polygons",
            polygons.len()
        );
        Ok(Assembly { polygons, report })
    }

    fn chain(
        &self,
        members: &[Member],
        deadline: Option<Instant>,
    ) -> Result<Vec<ChainedRing>, DeadlineExceeded> {
        let snap = self.config.snap_tolerance;
        match self.config.strategy {
            RingStrategy::Contains => {
                let all: Vec<&Member> = members.iter().collect();
                chain_rings(&all, None, snap, deadline)
            }
            RingStrategy::Union => {
                let mut rings = Vec::new();
                for role in [Some(Role::Outer), Some(Role::Inner), None] {
                    let group: Vec<&Member> =
                        members.iter().filter(|member| member.role == role).collect();
                    rings.extend(chain_rings(&group, role, snap, deadline)?);
                }
                Ok(rings)
            }
        }
    }
}

/// Repair every closed ring on its own, splitting self-intersecting rings
/// into simple parts and discarding those with no area.
fn clean_rings(closed: Vec<ChainedRing>, report: &mut AssemblyReport) -> Vec<Ring> {
    let mut rings = Vec::new();
    for candidate in closed {
        let polygon = Polygon::new(LineString::new(candidate.coords), Vec::new());
        let Some(parts) = repair_polygon(&polygon) else {
            report.discarded_rings += 1;
            continue;
        };
        if parts.0.len() != 1 || parts.0.first() != Some(&polygon) {
            report.repaired_polygons += 1;
        }
        rings.extend(
            parts
                .into_iter()
                .map(|part| Ring::new(part, candidate.role)),
        );
    }
    rings
}

/// An outer ring and the holes assigned to it.
struct Shell {
    outer: LineString<f64>,
    holes: Vec<LineString<f64>>,
}

/// Classify rings by nesting depth, ignoring roles.
fn nest_by_containment(mut rings: Vec<Ring>) -> Vec<Shell> {
    rings.sort_by(by_area_descending);
    let mut is_hole: Vec<bool> = Vec::with_capacity(rings.len());
    let mut shell_of: Vec<Option<usize>> = Vec::with_capacity(rings.len());
    let mut shells: Vec<Shell> = Vec::new();
    for (index, ring) in rings.iter().enumerate() {
        // Rings are sorted by area, so the last container is the smallest.
        let parent = rings
            .iter()
            .take(index)
            .rposition(|candidate| candidate.contains(ring));
        let hole = parent
            .and_then(|position| is_hole.get(position))
            .is_some_and(|parent_is_hole| !parent_is_hole);
        is_hole.push(hole);
        if hole {
            let owner = parent.and_then(|position| shell_of.get(position).copied().flatten());
            if let Some(shell) = owner.and_then(|position| shells.get_mut(position)) {
                shell.holes.push(ring.exterior());
            }
            shell_of.push(None);
        } else {
            shell_of.push(Some(shells.len()));
            shells.push(ring.shell());
        }
    }
    shells
}

/// Classify rings by role, merging overlapping outer rings.
fn nest_by_role(relation: i64, rings: Vec<Ring>, report: &mut AssemblyReport) -> Vec<Shell> {
    let (declared_outer, rest): (Vec<Ring>, Vec<Ring>) = rings
        .into_iter()
        .partition(|ring| ring.role == Some(Role::Outer));
    let (unassigned, mut inners): (Vec<Ring>, Vec<Ring>) =
        rest.into_iter().partition(|ring| ring.role.is_none());
    let mut outers = declared_outer;
    for ring in unassigned {
        if outers.iter().any(|outer| outer.contains(&ring)) {
            inners.push(ring);
        } else {
            outers.push(ring);
        }
    }

    let mut merged_outers = merge_outers(outers);
    merged_outers.sort_by(by_area_descending);
    let mut shells: Vec<Shell> = merged_outers.iter().map(Ring::shell).collect();
    inners.sort_by(by_area_descending);
    for inner in inners {
        let owner = merged_outers
            .iter()
            .rposition(|outer| outer.contains(&inner));
        match owner.and_then(|position| shells.get_mut(position)) {
            Some(shell) => shell.holes.push(inner.exterior()),
            None => {
                report.dropped_inner_rings += 1;
                warn!("relation {relation}: inner ring has no enclosing outer ring");
            }
        }
    }
    shells
}

/// Union outer rings that partially overlap. Nested outers are left alone
/// since they describe islands inside holes.
fn merge_outers(mut pending: Vec<Ring>) -> Vec<Ring> {
    let mut merged = Vec::with_capacity(pending.len());
    while let Some(mut current) = pending.pop() {
        while let Some(position) = pending
            .iter()
            .position(|other| current.polygon.relate(&other.polygon).is_overlaps())
        {
            let other = pending.swap_remove(position);
            let mut union = current.polygon.union(&other.polygon).0;
            if union.len() == 1
                && let Some(polygon) = union.pop()
            {
                current = Ring::new(polygon, Some(Role::Outer));
            } else {
                merged.extend(union.into_iter().map(|part| Ring::new(part, Some(Role::Outer))));
                break;
            }
        }
        merged.push(current);
    }
    merged
}

/// Build polygons from shells, repairing any that end up invalid.
fn finish_polygons(shells: Vec<Shell>, report: &mut AssemblyReport) -> Vec<Polygon<f64>> {
    let mut polygons = Vec::new();
    for shell in shells {
        let polygon = Polygon::new(shell.outer, shell.holes);
        if repair::is_valid(&polygon) {
            polygons.push(polygon);
            continue;
        }
        report.repaired_polygons += 1;
        match repair_polygon(&polygon) {
            Some(parts) => polygons.extend(parts),
            None => report.discarded_rings += 1,
        }
    }
    polygons
}
