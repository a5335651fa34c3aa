//! Typed column values and the rows that carry them.

use geo::{Geometry, Point};
use serde::{Deserialize, Serialize};

/// A typed column value produced by a codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean column.
    Bool(bool),
    /// Integer column.
    Integer(i64),
    /// Floating-point column.
    Real(f64),
    /// Text column.
    Text(String),
}

impl Value {
    /// Whether the value should count as "true" when used as a filter.
    #[must_use]
    pub const fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(flag) => *flag,
            Self::Integer(number) => *number != 0,
            Self::Real(number) => number.is_normal(),
            Self::Text(text) => !text.is_empty(),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// Storage class of a column, used by persistence adapters for DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Text storage.
    Text,
    /// Integer storage.
    Integer,
    /// Floating-point storage.
    Real,
    /// Boolean storage.
    Boolean,
}

impl ColumnType {
    /// SQL type name for this column.
    #[must_use]
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Boolean => "BOOLEAN",
        }
    }
}

/// Ordered column values for one table row.
///
/// Columns appear in field declaration order; an absent value is stored as
/// `None` rather than a zero or empty default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<(String, Option<Value>)>,
}

impl Row {
    /// Append a column.
    pub fn push(&mut self, column: impl Into<String>, value: Option<Value>) {
        self.columns.push((column.into(), value));
    }

    /// Look up a column value; `None` when absent or undeclared.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Whether the row declares the column, regardless of its value.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|(name, _)| name == column)
    }

    /// Iterate over `(column, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    /// Number of declared columns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A typed row routed to its destination table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Destination table name.
    pub table: String,
    /// Value of the `osm_id` column.
    pub osm_id: i64,
    /// Declared columns.
    pub row: Row,
    /// Geometry for the table's geometry column.
    pub geometry: Geometry<f64>,
    /// Representative interior point for tables with a label column.
    pub label_point: Option<Point<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Bool(true), true)]
    #[case(Value::Bool(false), false)]
    #[case(Value::Integer(0), false)]
    #[case(Value::Integer(-1), true)]
    #[case(Value::Text(String::new()), false)]
    fn truthiness_follows_value(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(value.is_truthy(), expected);
    }

    #[rstest]
    fn rows_keep_declaration_order_and_absence() {
        let mut row = Row::default();
        row.push("name", Some(Value::from("Main Street")));
        row.push("layer", None);
        let columns: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(columns, ["name", "layer"]);
        assert!(row.has_column("layer"));
        assert_eq!(row.get("layer"), None);
        assert_eq!(row.get("name"), Some(&Value::from("Main Street")));
    }
}
