//! Tag classification against a table's mapping rules.

use crate::element::Tags;
use crate::mapping::TableDefinition;

/// The rule an element matched for one table.
///
/// `key` feeds the `class` column and `value` feeds the `type` column and the
/// z-order calculators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    /// Matched tag key.
    pub key: &'a str,
    /// Value of the matched tag.
    pub value: &'a str,
}

/// Match `tags` against the rules of `table`.
///
/// Rules are tried in declaration order and the first match supplies the
/// discriminant. `None` means the element does not belong to the table; that
/// is not an error.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use trekmap_core::{GeometryCategory, TableDefinition, classify};
///
/// let table = TableDefinition::new("amenities", GeometryCategory::Point)
///     .with_rule("amenity", &["cafe"])
///     .with_rule("shop", &["bakery"]);
/// let tags = BTreeMap::from([
///     ("shop".to_owned(), "bakery".to_owned()),
///     ("amenity".to_owned(), "cafe".to_owned()),
/// ]);
/// let matched = classify(&tags, &table).expect("amenity rule matches");
/// assert_eq!((matched.key, matched.value), ("amenity", "cafe"));
/// ```
#[must_use]
pub fn classify<'a>(tags: &'a Tags, table: &TableDefinition) -> Option<Classification<'a>> {
    table.mapping.iter().find_map(|rule| {
        let (key, value) = tags.get_key_value(rule.key.as_str())?;
        rule.values.permits(value).then_some(Classification {
            key: key.as_str(),
            value: value.as_str(),
        })
    })
}
