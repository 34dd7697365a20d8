// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Survey record tokenizer using nom combinators
//!
//! Parses one `x y z flag` record per line. Fields are separated by runs of
//! blanks or by a comma with optional blanks around it.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, space0, space1},
    combinator::{opt, recognize, value},
    sequence::pair,
    IResult, Parser,
};

/// Raw record fields in file units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub flag: bool,
}

// ============================================================================
// Parsing Primitives
// ============================================================================

/// Parse a signed decimal number with optional exponent
fn number(input: &str) -> IResult<&str, f64> {
    let (rest, num_str) = recognize((
        opt(alt((char('-'), char('+')))),
        take_while1(|c: char| c.is_ascii_digit()),
        opt(pair(char('.'), take_while(|c: char| c.is_ascii_digit()))),
        opt((
            alt((char('e'), char('E'))),
            opt(alt((char('+'), char('-')))),
            take_while1(|c: char| c.is_ascii_digit()),
        )),
    ))
    .parse(input)?;

    // lexical-core rejects a leading '+'
    let digits = num_str.strip_prefix('+').unwrap_or(num_str);
    match lexical_core::parse::<f64>(digits.as_bytes()) {
        Ok(v) => Ok((rest, v)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

/// Parse an orientation flag (`1`, `0`, `true`, `false`)
fn flag(input: &str) -> IResult<&str, bool> {
    alt((
        value(true, tag_no_case("true")),
        value(false, tag_no_case("false")),
        value(true, tag("1")),
        value(false, tag("0")),
    ))
    .parse(input)
}

/// Parse a field separator
fn separator(input: &str) -> IResult<&str, ()> {
    alt((value((), (space0, char(','), space0)), value((), space1))).parse(input)
}

// ============================================================================
// Record Parsing
// ============================================================================

/// Parse a complete record line
///
/// Format: `x y z flag` or `x, y, z, flag`
pub fn parse_record(line: &str) -> Result<RawRecord, String> {
    let trimmed = line.trim_end_matches(['\r', '\n']);

    let (rest, (_, x, _, y, _, z, _, flag, _)) = (
        space0, number, separator, number, separator, number, separator, flag, space0,
    )
        .parse(trimmed)
        .map_err(|_: nom::Err<nom::error::Error<&str>>| {
            format!("expected `x y z flag`, found '{}'", trimmed.trim())
        })?;

    if !rest.is_empty() {
        return Err(format!("unexpected trailing input '{}'", rest.trim()));
    }

    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        return Err("coordinate out of range".to_string());
    }

    Ok(RawRecord { x, y, z, flag })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_scientific() {
        let (remaining, v) = number("-1.1045E4").unwrap();
        assert_eq!(remaining, "");
        assert!((v + 11045.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_number_leading_plus() {
        let (_, v) = number("+45.6").unwrap();
        assert!((v - 45.6).abs() < 1e-12);
    }

    #[test]
    fn test_parse_flag_variants() {
        assert_eq!(flag("1").unwrap().1, true);
        assert_eq!(flag("0").unwrap().1, false);
        assert_eq!(flag("TRUE").unwrap().1, true);
        assert_eq!(flag("False").unwrap().1, false);
        assert!(flag("yes").is_err());
    }

    #[test]
    fn test_parse_record_whitespace() {
        let record = parse_record("10.0\t20.0   -11000 1\r\n").unwrap();
        assert_eq!(
            record,
            RawRecord {
                x: 10.0,
                y: 20.0,
                z: -11000.0,
                flag: true
            }
        );
    }

    #[test]
    fn test_parse_record_commas() {
        let record = parse_record("  -3.5, 4 ,-11050.25,false").unwrap();
        assert_eq!(record.x, -3.5);
        assert_eq!(record.y, 4.0);
        assert!((record.z + 11050.25).abs() < 1e-12);
        assert!(!record.flag);
    }

    #[test]
    fn test_parse_record_missing_flag() {
        let err = parse_record("1 2 3").unwrap_err();
        assert!(err.contains("expected"));
    }

    #[test]
    fn test_parse_record_trailing_garbage() {
        let err = parse_record("1 2 3 1.0").unwrap_err();
        assert!(err.contains("trailing"));
    }
}
