//! Polygon validity checks and buffer-zero style repair.
//!
//! Repair re-nodes a polygon by taking its boolean union with nothing, which
//! splits self-intersections into separate simple parts and drops collapsed
//! spikes. Repair never panics; unrepairable input yields `None`.

use geo::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, BooleanOps, Coord, Line, LineString, MultiPolygon, Polygon, Relate};
use log::debug;

/// Check whether `polygon` is valid enough to store without repair.
///
/// Every ring must be closed with at least four vertices, enclose a non-zero
/// area and be free of self-intersections. Inner rings may touch each other
/// but must not overlap or cross.
pub(super) fn is_valid(polygon: &Polygon<f64>) -> bool {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .all(ring_is_valid)
        && holes_are_disjoint(polygon)
}

fn holes_are_disjoint(polygon: &Polygon<f64>) -> bool {
    let holes: Vec<Polygon<f64>> = polygon
        .interiors()
        .iter()
        .map(|ring| Polygon::new(ring.clone(), Vec::new()))
        .collect();
    holes.iter().enumerate().all(|(i, first)| {
        holes.iter().skip(i + 1).all(|second| {
            let matrix = first.relate(second);
            !matrix.is_intersects() || matrix.is_touches()
        })
    })
}

/// Subtract the union of all holes from the shell.
fn merge_holes(polygon: &Polygon<f64>) -> MultiPolygon<f64> {
    let shell = Polygon::new(polygon.exterior().clone(), Vec::new());
    let holes = polygon
        .interiors()
        .iter()
        .fold(MultiPolygon::new(Vec::new()), |merged, ring| {
            merged.union(&Polygon::new(ring.clone(), Vec::new()))
        });
    shell.difference(&holes)
}

fn ring_is_valid(ring: &LineString<f64>) -> bool {
    ring.is_closed()
        && ring.0.len() >= 4
        && Polygon::new(ring.clone(), Vec::new()).unsigned_area() > 0.0
        && ring_is_simple(ring)
}

fn ring_is_simple(ring: &LineString<f64>) -> bool {
    let lines: Vec<Line<f64>> = ring.lines().collect();
    let last = lines.len().saturating_sub(1);
    lines.iter().enumerate().all(|(i, first)| {
        lines
            .iter()
            .enumerate()
            .skip(i + 1)
            .all(|(j, second)| {
                let adjacent = j == i + 1 || (i == 0 && j == last);
                segments_compatible(*first, *second, adjacent)
            })
    })
}

fn segments_compatible(first: Line<f64>, second: Line<f64>, adjacent: bool) -> bool {
    match line_intersection(first, second) {
        None => true,
        Some(LineIntersection::SinglePoint { is_proper, .. }) => adjacent && !is_proper,
        Some(LineIntersection::Collinear { .. }) => false,
    }
}

fn coords_are_finite(polygon: &Polygon<f64>) -> bool {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|ring| ring.coords())
        .all(|Coord { x, y }| x.is_finite() && y.is_finite())
}

fn without_repeats(ring: &LineString<f64>) -> LineString<f64> {
    let mut coords = ring.0.clone();
    coords.dedup();
    LineString::new(coords)
}

/// Make `polygon` valid.
///
/// Valid input is returned unchanged as a single-part multipolygon. Invalid
/// input is re-noded and overlapping holes are merged; parts that collapse to
/// zero area are dropped. Returns
/// `None` when nothing with a positive area survives or when the input holds
/// non-finite coordinates.
///
/// # Examples
/// ```
/// use geo::polygon;
/// use trekmap_core::repair_polygon;
///
/// let bowtie = polygon![
///     (x: 0.0, y: 0.0),
///     (x: 2.0, y: 2.0),
///     (x: 2.0, y: 0.0),
///     (x: 0.0, y: 2.0),
///     (x: 0.0, y: 0.0),
/// ];
/// let repaired = repair_polygon(&bowtie).expect("two triangles survive");
/// assert_eq!(repaired.0.len(), 2);
/// ```
#[must_use]
pub fn repair_polygon(polygon: &Polygon<f64>) -> Option<MultiPolygon<f64>> {
    if !coords_are_finite(polygon) {
        debug!("discarding polygon with non-finite coordinates");
        return None;
    }
    let cleaned = Polygon::new(
        without_repeats(polygon.exterior()),
        polygon.interiors().iter().map(without_repeats).collect(),
    );
    if is_valid(&cleaned) {
        return Some(MultiPolygon::new(vec![cleaned]));
    }
    let renoded = if holes_are_disjoint(&cleaned) {
        cleaned.union(&MultiPolygon::new(Vec::new()))
    } else {
        merge_holes(&cleaned)
    };
    let parts: Vec<Polygon<f64>> = renoded
        .into_iter()
        .filter(|part| part.unsigned_area() > 0.0)
        .collect();
    if parts.is_empty() {
        debug!("polygon collapsed to zero area during repair");
        None
    } else {
        Some(MultiPolygon::new(parts))
    }
}
