//! Error taxonomy for nearest-neighbour runs.
//!
//! [`KnnError`] is the domain error. Job and I/O code wrap it in
//! [`anyhow::Error`] with context; callers that need to branch on the kind
//! can recover it with `err.downcast_ref::<KnnError>()`.
//!
//! A variant's `Display` already spells out any error it wraps, so
//! [`KnnError`] reports no `source()` and an alternate `{:#}` chain shows
//! each message once.

use std::fmt;
use std::path::PathBuf;

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
    pub source: PathBuf,
    /// 1-based.
    pub line_no: usize,
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.display(), self.line_no)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// The record did not split into exactly `identifier,x,y`.
    FieldCount { found: usize },
    EmptyIdentifier,
    /// A coordinate was not a finite real number.
    InvalidCoordinate { axis: char, value: String },
    /// Finite coordinates produced a non-finite distance (overflow).
    NonFiniteDistance { distance: f64 },
}

/// A malformed input record.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: String,
    pub location: Option<RecordLocation>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: &str) -> Self {
        Self {
            kind,
            line: line.to_string(),
            location: None,
        }
    }

    pub fn at(mut self, location: RecordLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref loc) = self.location {
            write!(f, "{loc}: ")?;
        }
        match &self.kind {
            ParseErrorKind::FieldCount { found } => {
                write!(f, "expected 3 fields (identifier,x,y), found {found}")?
            }
            ParseErrorKind::EmptyIdentifier => write!(f, "empty point identifier")?,
            ParseErrorKind::InvalidCoordinate { axis, value } => {
                write!(f, "{axis} coordinate {value:?} is not a finite number")?
            }
            ParseErrorKind::NonFiniteDistance { distance } => {
                write!(f, "distance to query point is not finite ({distance})")?
            }
        }
        write!(f, " in record {:?}", self.line)
    }
}

impl std::error::Error for ParseError {}

/// Invalid run configuration, reported per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl ConfigError {
    pub fn field<S: Into<String>, M: Into<String>>(field: S, message: M) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// How many malformed records a [`KnnError::MalformedRecords`] keeps for display.
pub const MAX_REPORTED_RECORDS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum KnnError {
    Config(ConfigError),
    /// A non-finite distance reached the accumulator.
    Computation { id: String, distance: f64 },
    /// The accumulator was used after it had been drained.
    AccumulatorDrained,
    /// Every malformed record of a run, collected before aborting.
    MalformedRecords {
        total: usize,
        sample: Vec<ParseError>,
    },
}

impl KnnError {
    pub fn config<S: Into<String>, M: Into<String>>(field: S, message: M) -> Self {
        KnnError::Config(ConfigError::field(field, message))
    }

    /// Summarise a run's malformed records, keeping the first few verbatim.
    pub fn malformed(errors: Vec<ParseError>) -> Self {
        let total = errors.len();
        let sample = errors.into_iter().take(MAX_REPORTED_RECORDS).collect();
        KnnError::MalformedRecords { total, sample }
    }
}

impl fmt::Display for KnnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnnError::Config(e) => write!(f, "config error: {e}"),
            KnnError::Computation { id, distance } => {
                write!(f, "computation error: non-finite distance {distance} for point {id:?}")
            }
            KnnError::AccumulatorDrained => write!(f, "accumulator already drained"),
            KnnError::MalformedRecords { total, sample } => {
                write!(f, "{total} malformed record(s)")?;
                for e in sample {
                    write!(f, "\n  {e}")?;
                }
                if *total > sample.len() {
                    write!(f, "\n  ... and {} more", total - sample.len())?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for KnnError {}
