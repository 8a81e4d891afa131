//! Parsing of `identifier,x,y` point records.

use crate::error::{ParseError, ParseErrorKind};
use crate::geometry::Coordinates;

/// Field separator of a point record.
pub const DELIMITER: char = ',';

/// One parsed input record.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub id: String,
    pub coords: Coordinates,
}

/// Parse one line into a [`Point`].
///
/// Fields are trimmed of surrounding whitespace, so a trailing `\r` from
/// CRLF input is tolerated.
///
/// # Errors
/// Returns a [`ParseError`] when the line does not have exactly three fields,
/// the identifier is empty, or a coordinate is not a finite number.
pub fn parse_record(line: &str) -> Result<Point, ParseError> {
    let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
    let [id, x, y] = fields.as_slice() else {
        return Err(ParseError::new(
            ParseErrorKind::FieldCount {
                found: fields.len(),
            },
            line,
        ));
    };
    if id.is_empty() {
        return Err(ParseError::new(ParseErrorKind::EmptyIdentifier, line));
    }

    Ok(Point {
        id: (*id).to_string(),
        coords: Coordinates::new(parse_coordinate('x', x, line)?, parse_coordinate('y', y, line)?),
    })
}

fn parse_coordinate(axis: char, field: &str, line: &str) -> Result<f64, ParseError> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::new(
            ParseErrorKind::InvalidCoordinate {
                axis,
                value: field.to_string(),
            },
            line,
        )),
    }
}
