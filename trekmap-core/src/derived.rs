//! Derived attribute calculators.
//!
//! These values never appear verbatim in the tags: a pseudo-area computed
//! from polygon geometry, draw-order integers, and the oneway direction
//! encoding. All functions are pure.
#![expect(
    clippy::float_arithmetic,
    reason = "area and unit conversion are inherently floating point"
)]

use std::f64::consts::PI;

use geo::{Area, Geometry};
use serde::{Deserialize, Serialize};

use crate::codec::parse_bool;
use crate::element::Tags;

/// Equatorial radius of the WGS84 ellipsoid in metres.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Z-order contribution of one OSM `layer` step.
pub const LAYER_STEP: i64 = 10;

/// Offset applied to bridges (added) and tunnels (subtracted).
///
/// Must exceed every class rank so that a bridge on the lowest class still
/// outranks the highest surface class on the same layer.
pub const BRUNNEL_OFFSET: i64 = 10;

/// Rank of railways that have no explicit road rank.
const RAILWAY_RANK: i64 = 7;

/// Road class ranks; finer classes rank lower. All ranks stay below
/// [`BRUNNEL_OFFSET`].
const ROAD_RANKS: &[(&str, i64)] = &[
    ("motorway", 9),
    ("trunk", 8),
    ("primary", 6),
    ("secondary", 5),
    ("tertiary", 4),
    ("motorway_link", 3),
    ("trunk_link", 3),
    ("primary_link", 3),
    ("secondary_link", 3),
    ("tertiary_link", 3),
    ("residential", 3),
    ("unclassified", 3),
    ("road", 3),
    ("minor", 3),
];

/// Working projection of the incoming coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// EPSG:3857; map units are metres.
    #[default]
    WebMercator,
    /// EPSG:4326; map units are degrees.
    Wgs84,
}

impl Projection {
    /// Convert a distance in metres to map units.
    #[must_use]
    pub fn meter_to_mapunit(self, meters: f64) -> f64 {
        match self {
            Self::WebMercator => meters,
            Self::Wgs84 => meters / (2.0 * PI * EARTH_RADIUS_M / 360.0),
        }
    }

    /// Convert an area in square metres to square map units.
    #[must_use]
    pub fn sqr_meter_to_mapunit(self, sqr_meters: f64) -> f64 {
        let side = self.meter_to_mapunit(sqr_meters.sqrt());
        side * side
    }

    /// Factor converting square map units to the square metres reported by
    /// pseudo-area columns.
    #[must_use]
    pub fn area_scale(self) -> f64 {
        1.0 / self.sqr_meter_to_mapunit(1.0)
    }
}

/// Planar area of polygonal geometry, scaled by `scale`.
///
/// Holes are subtracted, the sign is discarded and non-areal or degenerate
/// geometry yields zero.
///
/// # Examples
/// ```
/// use geo::{Geometry, polygon};
/// use trekmap_core::pseudo_area;
///
/// let square = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
/// assert_eq!(pseudo_area(&Geometry::Polygon(square), 1.0), 4.0);
/// ```
#[must_use]
pub fn pseudo_area(geometry: &Geometry<f64>, scale: f64) -> f64 {
    let area = match geometry {
        Geometry::Polygon(polygon) => polygon.unsigned_area(),
        Geometry::MultiPolygon(polygons) => polygons.unsigned_area(),
        _ => 0.0,
    };
    if area.is_finite() {
        (area * scale).abs()
    } else {
        0.0
    }
}

/// Draw priority of `class` in an explicit priority list.
///
/// The first entry has the highest priority and yields `0`. Classes that are
/// not listed sort below all listed ones and yield `priorities.len()`.
///
/// # Examples
/// ```
/// use trekmap_core::z_order;
///
/// let priorities = ["a".to_owned(), "b".to_owned(), "c".to_owned()];
/// assert_eq!(z_order(&priorities, "b"), 1);
/// assert_eq!(z_order(&priorities, "z"), 3);
/// ```
#[must_use]
pub fn z_order(priorities: &[String], class: &str) -> i64 {
    let index = priorities
        .iter()
        .position(|candidate| candidate == class)
        .unwrap_or(priorities.len());
    i64::try_from(index).unwrap_or(i64::MAX)
}

/// Synthetic z-order for roads and railways.
///
/// Combines the OSM `layer`, a class rank and bridge/tunnel offsets so that on
/// any layer every tunnel sorts below every surface way, which sorts below every
/// bridge; within a tier the class rank breaks ties.
#[must_use]
pub fn way_z_order(class: &str, tags: &Tags) -> i64 {
    let layer = tags
        .get("layer")
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(0);
    let rank = ROAD_RANKS
        .iter()
        .find_map(|(name, rank)| (*name == class).then_some(*rank))
        .unwrap_or_else(|| {
            if tags.contains_key("railway") {
                RAILWAY_RANK
            } else {
                0
            }
        });
    let mut z = layer.saturating_mul(LAYER_STEP).saturating_add(rank);
    if flag(tags, "tunnel") {
        z = z.saturating_sub(BRUNNEL_OFFSET);
    }
    if flag(tags, "bridge") {
        z = z.saturating_add(BRUNNEL_OFFSET);
    }
    z
}

fn flag(tags: &Tags, key: &str) -> bool {
    tags.get(key)
        .and_then(|raw| parse_bool(raw))
        .unwrap_or(false)
}

/// Oneway direction of a linear feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Travel follows the vertex order.
    Forward,
    /// Travel runs against the vertex order.
    Backward,
    /// Both directions, or unknown.
    Bidirectional,
}

impl Direction {
    /// Interpret the `oneway` tag vocabulary.
    ///
    /// Unrecognised or missing values are bidirectional.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("yes" | "true" | "1") => Self::Forward,
            Some("-1" | "reverse") => Self::Backward,
            _ => Self::Bidirectional,
        }
    }

    /// Signed integer encoding stored in the column.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
            Self::Bidirectional => 0,
        }
    }
}
