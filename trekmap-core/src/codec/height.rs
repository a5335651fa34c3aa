//! Height values such as `12`, `3,5 m` or `40ft`, stored in centimetres.
#![expect(
    clippy::float_arithmetic,
    reason = "heights are decimal measurements scaled to centimetres"
)]

use thiserror::Error;

const CENTIMETRES_PER_METRE: f64 = 100.0;
const CENTIMETRES_PER_FOOT: f64 = 30.48;

/// Errors returned by [`parse_height`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeightParseError {
    /// The numeric part could not be parsed.
    #[error("height {raw:?} is not a number")]
    NotANumber {
        /// Raw tag value.
        raw: String,
    },
    /// The scaled value does not fit the integer column.
    #[error("height {raw:?} is out of range")]
    OutOfRange {
        /// Raw tag value.
        raw: String,
    },
}

/// Parse a height tag into integer centimetres.
///
/// Values without a unit and values suffixed with `m` are metres; values
/// suffixed with `ft` are feet. Both `.` and `,` are accepted as the decimal
/// separator. Blank input is absent rather than an error.
///
/// # Examples
/// ```
/// use trekmap_core::parse_height;
///
/// assert_eq!(parse_height("3m"), Ok(Some(300)));
/// assert_eq!(parse_height("10ft"), Ok(Some(305)));
/// assert_eq!(parse_height("3,5m"), Ok(Some(350)));
/// assert_eq!(parse_height(""), Ok(None));
/// assert!(parse_height("abc").is_err());
/// ```
pub fn parse_height(raw: &str) -> Result<Option<i64>, HeightParseError> {
    let lowered = raw.trim().to_ascii_lowercase();
    let (number, multiplier) = if let Some(metres) = lowered.strip_suffix('m') {
        (metres.trim_end(), CENTIMETRES_PER_METRE)
    } else if let Some(feet) = lowered.strip_suffix("ft") {
        (feet.trim_end(), CENTIMETRES_PER_FOOT)
    } else {
        (lowered.as_str(), CENTIMETRES_PER_METRE)
    };
    if number.is_empty() {
        return Ok(None);
    }
    let parsed: f64 = number
        .replace(',', ".")
        .parse()
        .map_err(|_| HeightParseError::NotANumber {
            raw: raw.to_owned(),
        })?;
    if !parsed.is_finite() {
        return Err(HeightParseError::NotANumber {
            raw: raw.to_owned(),
        });
    }
    to_centimetres(parsed * multiplier).map(Some).ok_or_else(|| {
        HeightParseError::OutOfRange {
            raw: raw.to_owned(),
        }
    })
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "range is checked before the cast"
)]
fn to_centimetres(scaled: f64) -> Option<i64> {
    let rounded = scaled.round();
    (rounded >= i64::MIN as f64 && rounded < i64::MAX as f64).then_some(rounded as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("3m", Some(300))]
    #[case("3 m", Some(300))]
    #[case("3M", Some(300))]
    #[case("12", Some(1200))]
    #[case("10ft", Some(305))]
    #[case("10 ft", Some(305))]
    #[case("3,5m", Some(350))]
    #[case("3.25", Some(325))]
    #[case("", None)]
    #[case("  ", None)]
    #[case("m", None)]
    fn parses_heights(#[case] raw: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_height(raw), Ok(expected));
    }

    #[rstest]
    #[case("abc")]
    #[case("5'")]
    #[case("1.2.3")]
    #[case("inf")]
    fn rejects_non_numeric_heights(#[case] raw: &str) {
        assert!(matches!(
            parse_height(raw),
            Err(HeightParseError::NotANumber { .. })
        ));
    }

    #[rstest]
    fn rejects_out_of_range_heights() {
        assert!(matches!(
            parse_height("1e300"),
            Err(HeightParseError::OutOfRange { .. })
        ));
    }
}
