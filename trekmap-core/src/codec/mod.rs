//! Field codec registry.
//!
//! Every column of a table is produced by one [`Codec`]. Codecs are a closed
//! set of variants dispatched through [`Codec::convert`]; each one turns the
//! raw tag value plus element context into a typed [`Value`] or absence.
//! Conversion failures are logged and become absent values; they never abort
//! row construction.

mod height;
mod name;

use geo::Geometry;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::derived::{Direction, pseudo_area, way_z_order, z_order};
use crate::element::Element;
use crate::value::{ColumnType, Value};

pub use height::{HeightParseError, parse_height};
pub use name::Transliterator;

/// Conversion applied to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Codec {
    /// Raw tag value as text.
    String,
    /// `yes`/`true`/`1` and `no`/`false`/`0`; anything else is absent.
    Bool,
    /// Any integer.
    Integer,
    /// An integer restricted to an admissible set.
    OneOfInt {
        /// Admissible values.
        values: Vec<i64>,
    },
    /// Plain local name.
    Name,
    /// `name:<lang>` with a transliterated fallback from `name`.
    LocalizedName {
        /// Language suffix, e.g. `en`.
        lang: String,
    },
    /// The matched mapping key.
    Class,
    /// Oneway direction encoded as `1`, `-1` or `0`.
    Direction,
    /// Height in centimetres.
    Height,
    /// Index of the matched value in a priority list.
    ZOrder {
        /// Matched values in priority order, highest first.
        priorities: Vec<String>,
    },
    /// Synthetic road/rail z-order from layer, class and bridge/tunnel flags.
    WayZOrder,
    /// Area of the polygon geometry in map units.
    PseudoArea,
}

/// Everything a codec may consult besides the raw tag value.
#[derive(Clone, Copy)]
pub struct FieldContext<'a> {
    /// Element being converted.
    pub element: &'a Element,
    /// Mapping rule the element matched for this table.
    pub classification: &'a Classification<'a>,
    /// Resolved geometry, when one exists for the table.
    pub geometry: Option<&'a Geometry<f64>>,
    /// Optional transliteration collaborator.
    pub transliterator: Option<&'a dyn Transliterator>,
    /// Factor applied to pseudo-areas.
    pub area_scale: f64,
}

impl Codec {
    /// Storage class of the column this codec produces.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        match self {
            Self::String | Self::Name | Self::LocalizedName { .. } | Self::Class => {
                ColumnType::Text
            }
            Self::Bool => ColumnType::Boolean,
            Self::Integer
            | Self::OneOfInt { .. }
            | Self::Direction
            | Self::Height
            | Self::ZOrder { .. }
            | Self::WayZOrder => ColumnType::Integer,
            Self::PseudoArea => ColumnType::Real,
        }
    }

    /// Whether the codec derives its value from polygon geometry.
    #[must_use]
    pub const fn needs_polygon(&self) -> bool {
        matches!(self, Self::PseudoArea)
    }

    /// Convert a raw tag value into a column value.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use trekmap_core::{Classification, Codec, Element, FieldContext, Value};
    ///
    /// let element = Element::node(1, Coord { x: 0.0, y: 0.0 }, [("admin_level", "4")]);
    /// let classification = Classification { key: "boundary", value: "administrative" };
    /// let context = FieldContext {
    ///     element: &element,
    ///     classification: &classification,
    ///     geometry: None,
    ///     transliterator: None,
    ///     area_scale: 1.0,
    /// };
    /// let codec = Codec::OneOfInt { values: vec![1, 2, 3, 4, 5, 6] };
    /// assert_eq!(codec.convert(Some("4"), &context), Some(Value::Integer(4)));
    /// assert_eq!(codec.convert(Some("8"), &context), None);
    /// ```
    #[must_use]
    pub fn convert(&self, raw: Option<&str>, context: &FieldContext<'_>) -> Option<Value> {
        let element = context.element;
        match self {
            Self::String | Self::Name => raw.map(Value::from),
            Self::Bool => raw.and_then(parse_bool).map(Value::Bool),
            Self::Integer => raw.and_then(|value| parse_integer(value, element)),
            Self::OneOfInt { values } => raw
                .and_then(|value| parse_integer(value, element))
                .filter(|value| matches!(value, Value::Integer(n) if values.contains(n))),
            Self::LocalizedName { .. } => {
                name::localized_name(element, raw, context.transliterator).map(Value::Text)
            }
            Self::Class => Some(Value::from(context.classification.key)),
            Self::Direction => Some(Value::Integer(Direction::parse(raw).as_i64())),
            Self::Height => raw.and_then(|value| match parse_height(value) {
                Ok(height) => height.map(Value::Integer),
                Err(err) => {
                    warn!("failed to process height value for {}: {err}", element.id);
                    None
                }
            }),
            Self::ZOrder { priorities } => Some(Value::Integer(z_order(
                priorities,
                context.classification.value,
            ))),
            Self::WayZOrder => Some(Value::Integer(way_z_order(
                context.classification.value,
                &element.tags,
            ))),
            Self::PseudoArea => context
                .geometry
                .map(|geometry| Value::Real(pseudo_area(geometry, context.area_scale))),
        }
    }
}

/// Parse the OSM boolean vocabulary.
///
/// Returns `None` for values outside `yes`/`true`/`1` and `no`/`false`/`0`.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_integer(raw: &str, element: &Element) -> Option<Value> {
    match raw.trim().parse::<i64>() {
        Ok(number) => Some(Value::Integer(number)),
        Err(err) => {
            debug!("ignoring integer value {raw:?} for {}: {err}", element.id);
            None
        }
    }
}
