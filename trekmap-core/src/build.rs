//! Row construction for one element.
//!
//! [`RowBuilder`] evaluates an element against every table of a [`Mapping`]
//! independently: classification, field filters, geometry resolution and
//! codec evaluation. Polygon geometry is resolved at most once per element
//! no matter how many polygon tables match.

use std::cell::OnceCell;
use std::sync::Arc;

use geo::{Area, Coord, Geometry, InteriorPoint, LineString, MultiPolygon, Point, Polygon};
use log::{debug, warn};

use crate::assemble::{RelationAssembler, repair_polygon};
use crate::classify::{Classification, classify};
use crate::codec::{Codec, FieldContext, Transliterator};
use crate::diagnostics::Diagnostics;
use crate::element::{Element, ElementGeometry, is_closed};
use crate::engine::EngineConfig;
use crate::mapping::{GeometryCategory, Mapping, TYPE_COLUMN, TableDefinition};
use crate::value::{Record, Row, Value};

/// Minimum vertex count of a closed way used as a polygon.
const MIN_RING_VERTICES: usize = 4;

/// Turns elements into typed, table-routed records.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use trekmap_core::{Element, EngineConfig, Mapping, RowBuilder, Value};
///
/// let builder = RowBuilder::new(Mapping::maptrek(), &EngineConfig::default());
/// let cafe = Element::node(
///     42,
///     Coord { x: 10.0, y: 20.0 },
///     [("amenity", "cafe"), ("name", "Corner")],
/// );
/// let records = builder.build(&cafe);
/// let amenity = records.iter().find(|r| r.table == "amenities").expect("cafe row");
/// assert_eq!(amenity.row.get("name"), Some(&Value::from("Corner")));
/// assert_eq!(amenity.osm_id, 42);
/// ```
pub struct RowBuilder {
    mapping: Mapping,
    assembler: RelationAssembler,
    area_scale: f64,
    linestring_max_length: usize,
    transliterator: Option<Arc<dyn Transliterator>>,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for RowBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowBuilder")
            .field("tables", &self.mapping.tables().len())
            .field("assembler", &self.assembler)
            .field("linestring_max_length", &self.linestring_max_length)
            .field("transliterator", &self.transliterator.is_some())
            .finish_non_exhaustive()
    }
}

impl RowBuilder {
    /// Create a builder for `mapping` with the given engine settings.
    #[must_use]
    pub fn new(mapping: Mapping, config: &EngineConfig) -> Self {
        Self {
            mapping,
            assembler: RelationAssembler::new(config.assembly.clone()),
            area_scale: config.projection.area_scale(),
            linestring_max_length: config.linestring_max_length,
            transliterator: None,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Use `transliterator` for localized-name fallbacks.
    #[must_use]
    pub fn with_transliterator(mut self, transliterator: Arc<dyn Transliterator>) -> Self {
        self.transliterator = Some(transliterator);
        self
    }

    /// The mapping rows are built for.
    #[must_use]
    pub const fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Counters accumulated by this builder.
    #[must_use]
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Build every record `element` produces, in table declaration order.
    ///
    /// Unmatched tables, filtered tables and unresolvable geometry simply
    /// contribute no records.
    #[must_use]
    pub fn build(&self, element: &Element) -> Vec<Record> {
        let polygon = OnceCell::new();
        let mut records = Vec::new();
        for table in self.mapping.tables() {
            let Some(classification) = classify(&element.tags, table) else {
                self.diagnostics.unmatched();
                continue;
            };
            if self.is_filtered(element, table, &classification) {
                debug!("element {} filtered out of {}", element.id, table.name);
                self.diagnostics.filtered();
                continue;
            }
            let geometries = match table.geometry {
                GeometryCategory::Point => point_geometry(element),
                GeometryCategory::Line => self.line_geometries(element),
                GeometryCategory::Polygon => polygon
                    .get_or_init(|| self.polygon_geometry(element))
                    .iter()
                    .cloned()
                    .collect(),
            };
            let Some(first) = geometries.first() else {
                continue;
            };
            let Some(row) = self.build_row(element, table, &classification, first) else {
                continue;
            };
            let label_point = if table.with_label_field {
                interior_label(first)
            } else {
                None
            };
            records.extend(geometries.into_iter().map(|geometry| Record {
                table: table.name.clone(),
                osm_id: element.row_id(),
                row: row.clone(),
                geometry,
                label_point,
            }));
        }
        self.diagnostics.element_processed(records.len());
        records
    }

    fn context<'a>(
        &'a self,
        element: &'a Element,
        classification: &'a Classification<'a>,
        geometry: Option<&'a Geometry<f64>>,
    ) -> FieldContext<'a> {
        FieldContext {
            element,
            classification,
            geometry,
            transliterator: self.transliterator.as_deref(),
            area_scale: self.area_scale,
        }
    }

    fn is_filtered(
        &self,
        element: &Element,
        table: &TableDefinition,
        classification: &Classification<'_>,
    ) -> bool {
        let context = self.context(element, classification, None);
        table.field_filter.iter().any(|filter| {
            filter
                .codec
                .convert(element.tag(&filter.key), &context)
                .is_some_and(|value| value.is_truthy())
        })
    }

    fn build_row(
        &self,
        element: &Element,
        table: &TableDefinition,
        classification: &Classification<'_>,
        geometry: &Geometry<f64>,
    ) -> Option<Row> {
        let context = self.context(element, classification, Some(geometry));
        let mut row = Row::default();
        if table.with_type_field {
            row.push(TYPE_COLUMN, Some(Value::from(classification.value)));
        }
        for field in &table.fields {
            let raw = element.tag(&field.source_key());
            let converted = field.codec.convert(raw, &context);
            if raw.is_some() && converted.is_none() && parses_source(&field.codec) {
                self.diagnostics.field_failed();
            }
            let value = converted.or_else(|| field.default.clone());
            if value.is_none() && field.mandatory {
                debug!(
                    "element {} lacks mandatory column {} of {}",
                    element.id, field.column, table.name
                );
                return None;
            }
            row.push(field.column.clone(), value);
        }
        Some(row)
    }

    fn line_geometries(&self, element: &Element) -> Vec<Geometry<f64>> {
        let ElementGeometry::Way(coords) = &element.geometry else {
            return Vec::new();
        };
        if coords.len() < 2 {
            debug!("way {} has fewer than two vertices", element.id);
            return Vec::new();
        }
        split_linestring(coords, self.linestring_max_length)
            .into_iter()
            .map(Geometry::LineString)
            .collect()
    }

    fn polygon_geometry(&self, element: &Element) -> Option<Geometry<f64>> {
        match &element.geometry {
            ElementGeometry::Way(coords)
                if is_closed(coords) && coords.len() >= MIN_RING_VERTICES =>
            {
                let ring = Polygon::new(LineString::new(coords.clone()), Vec::new());
                let repaired = repair_polygon(&ring);
                if repaired.is_none() {
                    warn!("way {} has an unrepairable ring, skipping", element.id);
                }
                repaired.map(|parts| match <[Polygon<f64>; 1]>::try_from(parts.0) {
                    Ok([single]) => Geometry::Polygon(single),
                    Err(many) => Geometry::MultiPolygon(MultiPolygon::new(many)),
                })
            }
            ElementGeometry::Relation(members) if element.is_area_relation() => {
                match self.assembler.assemble(element.id, members) {
                    Ok(assembly) => {
                        self.diagnostics.assembled(&assembly.report);
                        let geometry = assembly.geometry();
                        if geometry.is_none() {
                            warn!("relation {} produced no valid polygons", element.id);
                        }
                        geometry
                    }
                    Err(err) => {
                        self.diagnostics.assembly_failed(&err);
                        debug!("skipping relation {}: {err}", element.id);
                        None
                    }
                }
            }
            _ => None,
        }
    }
}

/// Codecs whose absence on a present tag signals a conversion failure.
const fn parses_source(codec: &Codec) -> bool {
    matches!(
        codec,
        Codec::Bool | Codec::Integer | Codec::OneOfInt { .. } | Codec::Height
    )
}

fn point_geometry(element: &Element) -> Vec<Geometry<f64>> {
    match element.geometry {
        ElementGeometry::Point(coord) => vec![Geometry::Point(Point::from(coord))],
        ElementGeometry::Way(_) | ElementGeometry::Relation(_) => Vec::new(),
    }
}

/// Split `coords` into consecutive pieces of at most `max_vertices` vertices.
///
/// Neighbouring pieces share their boundary vertex. Values below two disable
/// splitting.
fn split_linestring(coords: &[Coord<f64>], max_vertices: usize) -> Vec<LineString<f64>> {
    if max_vertices < 2 || coords.len() <= max_vertices {
        return vec![LineString::new(coords.to_vec())];
    }
    let step = max_vertices - 1;
    (0..coords.len() - 1)
        .step_by(step)
        .map(|start| {
            LineString::new(coords.iter().skip(start).take(max_vertices).copied().collect())
        })
        .collect()
}

/// Interior point of the largest polygon in `geometry`.
fn interior_label(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => polygon.interior_point(),
        Geometry::MultiPolygon(polygons) => polygons
            .iter()
            .max_by(|left, right| left.unsigned_area().total_cmp(&right.unsigned_area()))
            .and_then(InteriorPoint::interior_point),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::FieldDeclaration;
    use rstest::{fixture, rstest};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn square(size: f64) -> Vec<Coord<f64>> {
        vec![c(0.0, 0.0), c(size, 0.0), c(size, size), c(0.0, size), c(0.0, 0.0)]
    }

    #[fixture]
    fn builder() -> RowBuilder {
        RowBuilder::new(Mapping::maptrek(), &EngineConfig::default())
    }

    fn tables(records: &[Record]) -> Vec<&str> {
        records.iter().map(|record| record.table.as_str()).collect()
    }

    #[rstest]
    fn unmatched_elements_produce_nothing(builder: RowBuilder) {
        let bench = Element::node(1, c(0.0, 0.0), [("leisure", "picnic_table")]);
        assert!(builder.build(&bench).is_empty());
        assert_eq!(builder.diagnostics().snapshot().records, 0);
    }

    #[rstest]
    fn area_highways_are_filtered_from_line_tables(builder: RowBuilder) {
        let square_road = Element::way(
            2,
            square(10.0),
            [("highway", "primary"), ("area", "yes")],
        );
        let records = builder.build(&square_road);
        assert!(!tables(&records).contains(&"motorways"));
        assert_eq!(builder.diagnostics().snapshot().rows_filtered, 1);
    }

    #[rstest]
    fn highway_booleans_default_to_false(builder: RowBuilder) {
        let road = Element::way(3, vec![c(0.0, 0.0), c(5.0, 0.0)], [("highway", "secondary")]);
        let records = builder.build(&road);
        let row = &records.first().expect("mainroads row").row;
        assert_eq!(row.get("type"), Some(&Value::from("secondary")));
        assert_eq!(row.get("tunnel"), Some(&Value::Bool(false)));
        assert_eq!(row.get("bridge"), Some(&Value::Bool(false)));
        assert_eq!(row.get("name"), None);
        assert!(row.has_column("name"));
    }

    #[rstest]
    fn closed_ways_feed_polygon_tables_with_labels(builder: RowBuilder) {
        let house = Element::way(4, square(10.0), [("building", "yes")]);
        let records = builder.build(&house);
        let building = records
            .iter()
            .find(|record| record.table == "buildings")
            .expect("building row");
        assert!(matches!(building.geometry, Geometry::Polygon(_)));
        assert!(building.label_point.is_some());
        assert!(!building.row.has_column("type"));
    }

    #[rstest]
    fn short_closed_ways_are_not_polygons(builder: RowBuilder) {
        let sliver = Element::way(
            5,
            vec![c(0.0, 0.0), c(1.0, 0.0), c(0.0, 0.0)],
            [("building", "yes")],
        );
        assert!(builder.build(&sliver).is_empty());
    }

    #[rstest]
    fn relations_carry_negated_ids(builder: RowBuilder) {
        let lake = Element::relation(
            77,
            vec![crate::element::Member::new(1, None, square(100.0))],
            [("type", "multipolygon"), ("natural", "water")],
        );
        let records = builder.build(&lake);
        let water = records.first().expect("water row");
        assert_eq!(water.table, "waterareas");
        assert_eq!(water.osm_id, -77);
        assert_eq!(builder.diagnostics().snapshot().relations_assembled, 1);
    }

    #[rstest]
    fn polygon_assembly_runs_once_per_element(builder: RowBuilder) {
        let park = Element::relation(
            78,
            vec![crate::element::Member::new(1, None, square(100.0))],
            [("type", "multipolygon"), ("leisure", "park"), ("building", "yes")],
        );
        let records = builder.build(&park);
        assert!(records.len() >= 2, "matched several polygon tables");
        assert_eq!(builder.diagnostics().snapshot().relations_assembled, 1);
    }

    #[rstest]
    fn route_relations_never_produce_rows(builder: RowBuilder) {
        let route = Element::relation(
            79,
            vec![crate::element::Member::new(1, None, square(100.0))],
            [("type", "route"), ("natural", "water")],
        );
        assert!(builder.build(&route).is_empty());
    }

    #[rstest]
    fn mandatory_fields_drop_rows() {
        let table = TableDefinition::new("peaks", GeometryCategory::Point)
            .with_fields([FieldDeclaration::new("ele", Codec::Integer).mandatory()])
            .with_rule("natural", &["peak"]);
        let mapping = Mapping::new(vec![table]).expect("valid mapping");
        let builder = RowBuilder::new(mapping, &EngineConfig::default());
        let nameless = Element::node(1, c(0.0, 0.0), [("natural", "peak"), ("ele", "high")]);
        assert!(builder.build(&nameless).is_empty());
        assert_eq!(builder.diagnostics().snapshot().field_failures, 1);
        let measured = Element::node(2, c(0.0, 0.0), [("natural", "peak"), ("ele", "812")]);
        assert_eq!(builder.build(&measured).len(), 1);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(5, 1)]
    #[case(3, 2)]
    #[case(2, 4)]
    fn long_lines_are_split(#[case] max_vertices: usize, #[case] pieces: usize) {
        let coords: Vec<Coord<f64>> = (0..5_i32).map(|i| c(f64::from(i), 0.0)).collect();
        let split = split_linestring(&coords, max_vertices);
        assert_eq!(split.len(), pieces);
        assert!(split.iter().all(|piece| piece.0.len() >= 2));
        let last = split.last().and_then(|piece| piece.0.last()).copied();
        assert_eq!(last, coords.last().copied());
    }
}
