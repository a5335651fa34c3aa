//! Decoded OpenStreetMap elements as handed over by the upstream decoder.
//!
//! Elements arrive with coordinates already resolved: nodes carry a single
//! coordinate, ways carry their vertex sequence, and relations carry their
//! member ways together with the role each way plays. The engine treats
//! elements as immutable input and never rewrites their tags.

use std::collections::BTreeMap;

use geo::Coord;
use serde::{Deserialize, Serialize};

/// Tag mapping of an element.
///
/// A `BTreeMap` keeps iteration deterministic so that two runs over the same
/// input produce identical rows.
pub type Tags = BTreeMap<String, String>;

/// A decoded OSM primitive.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use trekmap_core::{Element, ElementGeometry};
///
/// let node = Element::node(7, Coord { x: 1.0, y: 2.0 }, [("amenity", "cafe")]);
/// assert_eq!(node.tag("amenity"), Some("cafe"));
/// assert!(matches!(node.geometry, ElementGeometry::Point(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// OSM identifier, unique per element kind.
    pub id: i64,
    /// Key/value tags exactly as found in the source data.
    #[serde(default)]
    pub tags: Tags,
    /// Resolved geometry.
    pub geometry: ElementGeometry,
}

/// Resolved geometry of an [`Element`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ElementGeometry {
    /// A node position.
    Point(Coord<f64>),
    /// A way; closed when the first and last vertices coincide.
    Way(Vec<Coord<f64>>),
    /// A relation and its resolved member ways.
    Relation(Vec<Member>),
}

/// Discriminant of an [`Element`] used for logging and id encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// OSM node.
    Node,
    /// OSM way.
    Way,
    /// OSM relation.
    Relation,
}

/// A way referenced by a relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Identifier of the member way.
    pub way_id: i64,
    /// Declared role, if the member carries one.
    #[serde(default)]
    pub role: Option<Role>,
    /// Resolved vertices of the member way, possibly open.
    pub coords: Vec<Coord<f64>>,
}

/// Role of a relation member way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Boundary of the area.
    Outer,
    /// Boundary of a hole.
    Inner,
}

impl Role {
    /// Parse an OSM role string; empty and unknown roles are unset.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "outer" => Some(Self::Outer),
            "inner" => Some(Self::Inner),
            _ => None,
        }
    }
}

impl Member {
    /// Construct a member way.
    #[must_use]
    pub fn new(way_id: i64, role: Option<Role>, coords: Vec<Coord<f64>>) -> Self {
        Self {
            way_id,
            role,
            coords,
        }
    }
}

impl Element {
    /// Construct a node element.
    #[must_use]
    pub fn node<'a, T>(id: i64, location: Coord<f64>, tags: T) -> Self
    where
        T: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            id,
            tags: collect_tags(tags),
            geometry: ElementGeometry::Point(location),
        }
    }

    /// Construct a way element.
    #[must_use]
    pub fn way<'a, T>(id: i64, coords: Vec<Coord<f64>>, tags: T) -> Self
    where
        T: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            id,
            tags: collect_tags(tags),
            geometry: ElementGeometry::Way(coords),
        }
    }

    /// Construct a relation element.
    #[must_use]
    pub fn relation<'a, T>(id: i64, members: Vec<Member>, tags: T) -> Self
    where
        T: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            id,
            tags: collect_tags(tags),
            geometry: ElementGeometry::Relation(members),
        }
    }

    /// Kind of the element, derived from its geometry.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self.geometry {
            ElementGeometry::Point(_) => ElementKind::Node,
            ElementGeometry::Way(_) => ElementKind::Way,
            ElementGeometry::Relation(_) => ElementKind::Relation,
        }
    }

    /// Value of a tag, if present.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Identifier written to the `osm_id` column.
    ///
    /// Relation ids are negated so they cannot collide with way ids inside
    /// one polygon table.
    #[must_use]
    pub const fn row_id(&self) -> i64 {
        match self.kind() {
            ElementKind::Relation => self.id.wrapping_neg(),
            ElementKind::Node | ElementKind::Way => self.id,
        }
    }

    /// Whether this relation should be assembled into polygons.
    #[must_use]
    pub fn is_area_relation(&self) -> bool {
        self.kind() == ElementKind::Relation
            && matches!(self.tag("type"), Some("multipolygon" | "boundary"))
    }
}

fn collect_tags<'a, T>(tags: T) -> Tags
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

/// Whether a vertex sequence forms a closed ring.
pub(crate) fn is_closed(coords: &[Coord<f64>]) -> bool {
    match (coords.first(), coords.last()) {
        (Some(first), Some(last)) => coords.len() > 1 && first == last,
        _ => false,
    }
}
