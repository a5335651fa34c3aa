//! Declarative table mapping: which tags route an element into which table,
//! and which typed columns that table carries.
//!
//! The mapping is data, not code. Tables, rules and fields keep their
//! declaration order, which fixes classification precedence and column order.
//! A [`Mapping`] is validated once when it is built; malformed configuration
//! is the only fatal error in the engine.

mod maptrek;

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::Codec;
use crate::value::Value;

/// Column holding the element identifier.
pub const OSM_ID_COLUMN: &str = "osm_id";
/// Column holding the matched tag value when a table carries a type column.
pub const TYPE_COLUMN: &str = "type";
/// Column holding the geometry.
pub const GEOMETRY_COLUMN: &str = "geometry";
/// Column holding the label point of polygon tables.
pub const LABEL_COLUMN: &str = "label";

/// Wildcard marker accepted in value lists.
pub const ANY_VALUE: &str = "__any__";

/// Geometry category of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryCategory {
    /// Nodes.
    Point,
    /// Ways as linestrings.
    Line,
    /// Closed ways and multipolygon relations.
    Polygon,
}

/// Tag values that satisfy a mapping rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum AllowedValues {
    /// Any value triggers a match.
    Any,
    /// Only the listed values match.
    Only(BTreeSet<String>),
}

impl AllowedValues {
    /// Whether `value` satisfies the rule.
    #[must_use]
    pub fn permits(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(values) => values.contains(value),
        }
    }
}

impl From<Vec<String>> for AllowedValues {
    fn from(values: Vec<String>) -> Self {
        if values.iter().any(|value| value == ANY_VALUE) {
            Self::Any
        } else {
            Self::Only(values.into_iter().collect())
        }
    }
}

impl From<AllowedValues> for Vec<String> {
    fn from(values: AllowedValues) -> Self {
        match values {
            AllowedValues::Any => vec![ANY_VALUE.to_owned()],
            AllowedValues::Only(set) => set.into_iter().collect(),
        }
    }
}

/// A tag key and the values it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Tag key.
    pub key: String,
    /// Accepted values.
    pub values: AllowedValues,
}

/// A column and the codec that fills it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    /// Column name.
    pub column: String,
    /// Conversion applied to the source tag.
    pub codec: Codec,
    /// Tag read for the column; defaults to the column name.
    #[serde(default)]
    pub source: Option<String>,
    /// Drop the row for this table when the value is absent.
    #[serde(default)]
    pub mandatory: bool,
    /// Value used when the codec yields absence.
    #[serde(default)]
    pub default: Option<Value>,
}

impl FieldDeclaration {
    /// Declare a column read from the tag of the same name.
    #[must_use]
    pub fn new(column: &str, codec: Codec) -> Self {
        Self {
            column: column.to_owned(),
            codec,
            source: None,
            mandatory: false,
            default: None,
        }
    }

    /// Use `value` when the codec yields absence.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Drop the row when the value is absent.
    #[must_use]
    pub const fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Tag key the codec reads.
    #[must_use]
    pub fn source_key(&self) -> String {
        match (&self.source, &self.codec) {
            (Some(source), _) => source.clone(),
            (None, Codec::LocalizedName { lang }) => format!("name:{lang}"),
            (None, _) => self.column.clone(),
        }
    }
}

/// A tag test that excludes an element from a table when truthy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Tag key examined.
    pub key: String,
    /// Codec applied to the tag value.
    pub codec: Codec,
}

/// A named output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name without any storage prefix.
    pub name: String,
    /// Geometry category of the table.
    pub geometry: GeometryCategory,
    /// Columns in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDeclaration>,
    /// Whether the table carries the `type` column.
    #[serde(default = "default_true")]
    pub with_type_field: bool,
    /// Whether the table carries a label point (polygon tables only).
    #[serde(default)]
    pub with_label_field: bool,
    /// Rules in precedence order.
    pub mapping: Vec<MappingRule>,
    /// Filters that exclude elements from the table.
    #[serde(default)]
    pub field_filter: Vec<FieldFilter>,
}

const fn default_true() -> bool {
    true
}

impl TableDefinition {
    /// Start a table with a type column and no fields, rules or filters.
    #[must_use]
    pub fn new(name: &str, geometry: GeometryCategory) -> Self {
        Self {
            name: name.to_owned(),
            geometry,
            fields: Vec::new(),
            with_type_field: true,
            with_label_field: false,
            mapping: Vec::new(),
            field_filter: Vec::new(),
        }
    }

    /// Append field declarations.
    #[must_use]
    pub fn with_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = FieldDeclaration>,
    {
        self.fields.extend(fields);
        self
    }

    /// Append a rule accepting the listed values (`__any__` for all).
    #[must_use]
    pub fn with_rule(mut self, key: &str, values: &[&str]) -> Self {
        let values: Vec<String> = values.iter().map(|value| (*value).to_owned()).collect();
        self.mapping.push(MappingRule {
            key: key.to_owned(),
            values: AllowedValues::from(values),
        });
        self
    }

    /// Append a field filter.
    #[must_use]
    pub fn with_filter(mut self, key: &str, codec: Codec) -> Self {
        self.field_filter.push(FieldFilter {
            key: key.to_owned(),
            codec,
        });
        self
    }

    /// Drop the `type` column.
    #[must_use]
    pub const fn without_type_field(mut self) -> Self {
        self.with_type_field = false;
        self
    }

    /// Add the label point column.
    #[must_use]
    pub const fn with_label_field(mut self) -> Self {
        self.with_label_field = true;
        self
    }

    fn validate(&self) -> Result<(), MappingError> {
        let table = || self.name.clone();
        if self.name.trim().is_empty() {
            return Err(MappingError::EmptyTableName);
        }
        if self.mapping.is_empty() {
            return Err(MappingError::NoRules { table: table() });
        }
        if let Some(rule) = self
            .mapping
            .iter()
            .find(|rule| matches!(&rule.values, AllowedValues::Only(set) if set.is_empty()))
        {
            return Err(MappingError::EmptyValueSet {
                table: table(),
                key: rule.key.clone(),
            });
        }
        if self.with_label_field && self.geometry != GeometryCategory::Polygon {
            return Err(MappingError::LabelRequiresPolygon { table: table() });
        }

        let mut columns: HashSet<&str> = HashSet::from([OSM_ID_COLUMN, GEOMETRY_COLUMN]);
        if self.with_type_field {
            columns.insert(TYPE_COLUMN);
        }
        if self.with_label_field {
            columns.insert(LABEL_COLUMN);
        }
        for field in &self.fields {
            if !columns.insert(field.column.as_str()) {
                return Err(MappingError::DuplicateColumn {
                    table: table(),
                    column: field.column.clone(),
                });
            }
            self.validate_codec(field)?;
        }
        Ok(())
    }

    fn validate_codec(&self, field: &FieldDeclaration) -> Result<(), MappingError> {
        let column = || field.column.clone();
        match &field.codec {
            Codec::PseudoArea if self.geometry != GeometryCategory::Polygon => {
                Err(MappingError::CodecRequiresPolygon {
                    table: self.name.clone(),
                    column: column(),
                })
            }
            Codec::ZOrder { priorities } if priorities.is_empty() => {
                Err(MappingError::EmptyPriorities {
                    table: self.name.clone(),
                    column: column(),
                })
            }
            Codec::OneOfInt { values } if values.is_empty() => {
                Err(MappingError::EmptyAdmissibleSet {
                    table: self.name.clone(),
                    column: column(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Fatal configuration errors detected when a [`Mapping`] is built.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The mapping JSON could not be decoded.
    #[error("failed to parse table mapping: {0}")]
    Parse(#[from] serde_json::Error),
    /// A table has a blank name.
    #[error("table names must not be empty")]
    EmptyTableName,
    /// Two tables share a name.
    #[error("table {table:?} is declared more than once")]
    DuplicateTable {
        /// Offending table.
        table: String,
    },
    /// A table has no mapping rules and could never match.
    #[error("table {table:?} declares no mapping rules")]
    NoRules {
        /// Offending table.
        table: String,
    },
    /// A rule lists no values.
    #[error("rule {key:?} of table {table:?} accepts no values")]
    EmptyValueSet {
        /// Offending table.
        table: String,
        /// Rule key.
        key: String,
    },
    /// A column name is declared twice or collides with a built-in column.
    #[error("column {column:?} of table {table:?} is declared more than once")]
    DuplicateColumn {
        /// Offending table.
        table: String,
        /// Duplicated column.
        column: String,
    },
    /// A label point was requested on a non-polygon table.
    #[error("table {table:?} requests a label point but is not a polygon table")]
    LabelRequiresPolygon {
        /// Offending table.
        table: String,
    },
    /// An area codec was declared on a non-polygon table.
    #[error("column {column:?} of table {table:?} needs polygon geometry")]
    CodecRequiresPolygon {
        /// Offending table.
        table: String,
        /// Offending column.
        column: String,
    },
    /// A z-order codec lists no priorities.
    #[error("z-order column {column:?} of table {table:?} lists no classes")]
    EmptyPriorities {
        /// Offending table.
        table: String,
        /// Offending column.
        column: String,
    },
    /// A bounded-integer codec lists no admissible values.
    #[error("column {column:?} of table {table:?} admits no values")]
    EmptyAdmissibleSet {
        /// Offending table.
        table: String,
        /// Offending column.
        column: String,
    },
}

/// A validated, ordered collection of table definitions.
///
/// # Examples
/// ```
/// use trekmap_core::{Codec, FieldDeclaration, GeometryCategory, Mapping, TableDefinition};
///
/// # fn main() -> Result<(), trekmap_core::MappingError> {
/// let waterways = TableDefinition::new("waterways", GeometryCategory::Line)
///     .with_fields([FieldDeclaration::new("name", Codec::Name)])
///     .with_rule("waterway", &["river", "stream"])
///     .with_filter("tunnel", Codec::Bool);
/// let mapping = Mapping::new(vec![waterways])?;
/// assert!(mapping.table("waterways").is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mapping {
    tables: Vec<TableDefinition>,
}

#[derive(Deserialize)]
struct MappingFile {
    tables: Vec<TableDefinition>,
}

impl Mapping {
    /// Validate and wrap table definitions.
    pub fn new(tables: Vec<TableDefinition>) -> Result<Self, MappingError> {
        {
            let mut names = HashSet::new();
            for table in &tables {
                table.validate()?;
                if !names.insert(table.name.as_str()) {
                    return Err(MappingError::DuplicateTable {
                        table: table.name.clone(),
                    });
                }
            }
        }
        Ok(Self { tables })
    }

    /// Parse a mapping from JSON of the form `{"tables": [...]}`.
    pub fn from_json_str(json: &str) -> Result<Self, MappingError> {
        let file: MappingFile = serde_json::from_str(json)?;
        Self::new(file.tables)
    }

    /// Tables in declaration order.
    #[must_use]
    pub const fn tables(&self) -> &[TableDefinition] {
        self.tables.as_slice()
    }

    /// Look up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|table| table.name == name)
    }
}
