//! Candidates and the per-record emitter that produces them.

use crate::error::{ParseError, ParseErrorKind};
use crate::geometry::Coordinates;
use crate::io::SourceLine;
use crate::record::parse_record;

/// A point identifier paired with its distance to the query.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub distance: f64,
}

impl Candidate {
    pub fn new<S: Into<String>>(id: S, distance: f64) -> Self {
        Self {
            id: id.into(),
            distance,
        }
    }
}

/// Parses a record and measures it against a fixed query position.
///
/// Stateless apart from the query, so any number of copies can run on any
/// partition, and re-running one on the same record gives the same result.
#[derive(Clone, Copy, Debug)]
pub struct CandidateEmitter {
    query: Coordinates,
}

impl CandidateEmitter {
    pub fn new(query: Coordinates) -> Self {
        Self { query }
    }

    /// # Errors
    /// Any [`ParseError`] from the record, or
    /// [`ParseErrorKind::NonFiniteDistance`] when finite coordinates overflow.
    pub fn emit(&self, line: &str) -> Result<Candidate, ParseError> {
        let point = parse_record(line)?;
        let distance = point.coords.distance_to(&self.query);
        if !distance.is_finite() {
            return Err(ParseError::new(ParseErrorKind::NonFiniteDistance { distance }, line));
        }
        Ok(Candidate::new(point.id, distance))
    }

    /// Like [`emit`](Self::emit), attaching the record's location to errors.
    ///
    /// # Errors
    /// See [`emit`](Self::emit).
    pub fn emit_located(&self, record: &SourceLine) -> Result<Candidate, ParseError> {
        self.emit(&record.text)
            .map_err(|e| e.at(record.location.clone()))
    }
}
