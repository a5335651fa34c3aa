//! Localised name lookup with a transliterated fallback.

use crate::element::Element;

/// External transliteration service used by the localised-name codec.
///
/// Implementations must be thread-safe because rows are built on worker
/// threads. Returning `None` means the name could not be transliterated and
/// the original name is used unchanged.
///
/// # Examples
/// ```
/// use trekmap_core::Transliterator;
///
/// struct Upper;
///
/// impl Transliterator for Upper {
///     fn transliterate(&self, name: &str) -> Option<String> {
///         Some(name.to_uppercase())
///     }
/// }
///
/// assert_eq!(Upper.transliterate("köln"), Some("KÖLN".to_owned()));
/// ```
pub trait Transliterator: Send + Sync {
    /// Produce a Latin rendering of `name`.
    fn transliterate(&self, name: &str) -> Option<String>;
}

/// Resolve the `name:<lang>` value for `element`.
///
/// The exact localised tag wins. Otherwise the base `name` is passed once to
/// the transliterator, falling back to the untouched name when no
/// transliterator is configured or it declines.
pub(crate) fn localized_name(
    element: &Element,
    localized: Option<&str>,
    transliterator: Option<&dyn Transliterator>,
) -> Option<String> {
    if let Some(value) = localized {
        return Some(value.to_owned());
    }
    let base = element.tag("name")?;
    let fallback = transliterator.and_then(|service| service.transliterate(base));
    Some(fallback.unwrap_or_else(|| base.to_owned()))
}
