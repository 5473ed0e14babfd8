//! Parsing of the matrix specification string.
//!
//! A matrix is written as `tag=size[,tag=size...]`. Everything in this module is pure: it turns
//! strings into [`ElementSpec`]s and never touches the filesystem or the network. The effectful
//! part lives in [`element`](crate::element).

use std::collections::HashSet;
use std::num::ParseIntError;

use crate::error::{MatrixError, MatrixResult};

/// Separator between entries of a matrix string.
const ENTRY_SEPARATOR: char = ',';

/// Characters with a meaning in the StatsD line format.
const RESERVED_TAG_CHARS: &[char] = &[':', '|', '@', '#'];

/// A parsed `tag=size` entry, before any file is created for it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ElementSpec {
    /// Label of the element, used as a metric key component.
    pub tag: String,
    /// Size of the payload in bytes.
    pub size: u64,
}

impl ElementSpec {
    /// Parses a single `tag=size` entry.
    ///
    /// The entry is split on the first `=`. Whitespace around the tag is trimmed, the size is
    /// parsed as-is with [`parse_size`].
    pub fn parse(entry: &str) -> MatrixResult<Self> {
        let Some((tag, size)) = entry.split_once('=') else {
            return Err(MatrixError::MalformedEntry(entry.to_owned()));
        };

        let tag = tag.trim();
        if tag.is_empty() {
            return Err(MatrixError::EmptyTag(entry.to_owned()));
        }
        if tag.contains(RESERVED_TAG_CHARS) {
            return Err(MatrixError::InvalidTag(tag.to_owned()));
        }

        let size = parse_size(size).map_err(|source| MatrixError::InvalidSize {
            value: size.to_owned(),
            source,
        })?;

        Ok(Self {
            tag: tag.to_owned(),
            size,
        })
    }
}

/// Parses a whole matrix string into its entries, in order.
///
/// Fails on an empty matrix, on the first malformed entry, and on duplicate tags. Nothing is
/// returned unless every entry is valid.
pub fn parse_matrix(matrix: &str) -> MatrixResult<Vec<ElementSpec>> {
    if matrix.trim().is_empty() {
        return Err(MatrixError::MissingMatrix);
    }

    let specs = matrix
        .split(ENTRY_SEPARATOR)
        .map(ElementSpec::parse)
        .collect::<MatrixResult<Vec<_>>>()?;

    let mut seen = HashSet::with_capacity(specs.len());
    for spec in &specs {
        if !seen.insert(spec.tag.as_str()) {
            return Err(MatrixError::DuplicateTag(spec.tag.clone()));
        }
    }

    Ok(specs)
}

/// Parses an unsigned integer literal, detecting its base from the prefix.
///
/// - `0x` / `0X`: hexadecimal
/// - `0o` / `0O`, or a bare leading `0`: octal
/// - `0b` / `0B`: binary
/// - anything else: decimal
///
/// Underscores may separate digits in any base, e.g. `1_000`, `0x_ff_ff` or `0b1010_1010`. An
/// underscore must follow a digit or the base prefix and must not end the literal. Signs and
/// surrounding whitespace are not accepted.
pub fn parse_size(value: &str) -> Result<u64, ParseIntError> {
    let (radix, digits) = split_radix(value);

    let digits = if digits.starts_with(['+', '-']) {
        // `from_str_radix` would accept a leading `+`, but a lone sign is always invalid.
        "+".to_owned()
    } else if underscores_ok(digits, radix != 10) {
        digits.replace('_', "")
    } else {
        digits.to_owned()
    };

    u64::from_str_radix(&digits, radix)
}

fn split_radix(value: &str) -> (u32, &str) {
    let bytes = value.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return (10, value);
    }

    match bytes[1] {
        b'x' | b'X' => (16, &value[2..]),
        b'o' | b'O' => (8, &value[2..]),
        b'b' | b'B' => (2, &value[2..]),
        _ => (8, &value[1..]),
    }
}

/// Each `_` must come right after a digit or the base prefix, and the literal must not end in one.
fn underscores_ok(digits: &str, prefixed: bool) -> bool {
    let mut after_digit = prefixed;
    for c in digits.chars() {
        if c == '_' {
            if !after_digit {
                return false;
            }
            after_digit = false;
        } else {
            after_digit = true;
        }
    }
    after_digit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entry() {
        let spec = ElementSpec::parse("small=1024").unwrap();
        assert_eq!(
            spec,
            ElementSpec {
                tag: "small".into(),
                size: 1024
            }
        );
    }

    #[test]
    fn trims_tag_only() {
        let spec = ElementSpec::parse("  large object \t=4096").unwrap();
        assert_eq!(spec.tag, "large object");
        assert_eq!(spec.size, 4096);

        for entry in ["a= 10", "a=10 ", "a=\t10"] {
            let err = ElementSpec::parse(entry).unwrap_err();
            assert!(matches!(err, MatrixError::InvalidSize { .. }), "{entry:?}");
        }
    }

    #[test]
    fn splits_on_first_equals_sign() {
        let err = ElementSpec::parse("a=1=2").unwrap_err();
        assert!(
            matches!(&err, MatrixError::InvalidSize { value, .. } if value == "1=2"),
            "{err:?}"
        );
    }

    #[test]
    fn rejects_entry_without_size() {
        let err = ElementSpec::parse("tiny").unwrap_err();
        assert!(matches!(err, MatrixError::MalformedEntry(entry) if entry == "tiny"));
    }

    #[test]
    fn rejects_empty_tag() {
        let err = ElementSpec::parse("  =10").unwrap_err();
        assert!(matches!(err, MatrixError::EmptyTag(_)));
    }

    #[test]
    fn rejects_reserved_characters_in_tag() {
        for entry in ["a:b=1", "a|b=1", "a@b=1", "a#b=1"] {
            let err = ElementSpec::parse(entry).unwrap_err();
            assert!(matches!(err, MatrixError::InvalidTag(_)), "{entry}");
        }
    }

    #[test]
    fn invalid_size_names_offending_value() {
        let err = ElementSpec::parse("a=12kb").unwrap_err();
        assert_eq!(err.to_string(), "unable to convert `12kb` to an integer");
    }

    #[test]
    fn parses_size_bases() {
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("0x1000").unwrap(), 4096);
        assert_eq!(parse_size("0X1f").unwrap(), 31);
        assert_eq!(parse_size("010").unwrap(), 8);
        assert_eq!(parse_size("0o17").unwrap(), 15);
        assert_eq!(parse_size("0b101").unwrap(), 5);
        assert_eq!(parse_size("00").unwrap(), 0);
    }

    #[test]
    fn underscores_separate_digits() {
        assert_eq!(parse_size("1_000").unwrap(), 1000);
        assert_eq!(parse_size("1_048_576").unwrap(), 1 << 20);
        assert_eq!(parse_size("0x_ff_ff").unwrap(), 0xffff);
        assert_eq!(parse_size("0b1010_1010").unwrap(), 0b1010_1010);
        assert_eq!(parse_size("0_7").unwrap(), 7);

        for value in ["_1", "1__0", "10_", "0x1__0", "0x10_", "0x_", "0_"] {
            assert!(parse_size(value).is_err(), "{value:?} should not parse");
        }
    }

    #[test]
    fn rejects_invalid_sizes() {
        for value in ["", "-1", "+1", "0x", "08", "0b2", "1.5", "18446744073709551616"] {
            assert!(parse_size(value).is_err(), "{value:?} should not parse");
        }
        assert_eq!(parse_size("18446744073709551615").unwrap(), u64::MAX);
    }

    #[test]
    fn parses_matrix_in_order() {
        let specs = parse_matrix("a=10, b=0,c=4096").unwrap();
        let parsed: Vec<_> = specs.iter().map(|s| (s.tag.as_str(), s.size)).collect();
        assert_eq!(parsed, [("a", 10), ("b", 0), ("c", 4096)]);
    }

    #[test]
    fn rejects_empty_matrix() {
        assert!(matches!(parse_matrix(""), Err(MatrixError::MissingMatrix)));
        assert!(matches!(parse_matrix("  "), Err(MatrixError::MissingMatrix)));
    }

    #[test]
    fn rejects_trailing_separator() {
        let err = parse_matrix("a=1,").unwrap_err();
        assert!(matches!(err, MatrixError::MalformedEntry(entry) if entry.is_empty()));
    }

    #[test]
    fn rejects_duplicate_tags() {
        let err = parse_matrix("a=1,b=2, a =3").unwrap_err();
        assert!(matches!(err, MatrixError::DuplicateTag(tag) if tag == "a"));
    }
}
