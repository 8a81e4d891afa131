//! Run configuration.
//!
//! [`KnnConfig`] is what a caller supplies, from the command line or a JSON
//! file. [`KnnConfig::validate`] turns it into a [`QueryPoint`] and is the
//! only way to get one, so a run that starts has already passed every check.

use crate::error::KnnError;
use crate::geometry::Coordinates;
use crate::runner::{ExecMode, Reduction};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Where reports go when no destination is given.
pub const DEFAULT_OUTPUT_DESTINATION: &str = "knn_output";

/// Validate a requested neighbour count.
///
/// # Errors
/// [`KnnError::Config`] for `k <= 0`.
pub fn positive_capacity(k: i64) -> Result<NonZeroUsize, KnnError> {
    usize::try_from(k)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| KnnError::config("k", format!("must be a positive integer, got {k}")))
}

/// The query position and how many neighbours to return.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryPoint {
    coords: Coordinates,
    k: NonZeroUsize,
}

impl QueryPoint {
    /// # Errors
    /// [`KnnError::Config`] for non-finite coordinates or `k <= 0`.
    pub fn new(x: f64, y: f64, k: i64) -> Result<Self, KnnError> {
        if !x.is_finite() {
            return Err(KnnError::config("query_x", format!("must be a finite number, got {x}")));
        }
        if !y.is_finite() {
            return Err(KnnError::config("query_y", format!("must be a finite number, got {y}")));
        }
        Ok(Self {
            coords: Coordinates::new(x, y),
            k: positive_capacity(k)?,
        })
    }

    pub fn coords(&self) -> Coordinates {
        self.coords
    }

    pub fn k(&self) -> usize {
        self.k.get()
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.k
    }
}

/// What to do with records that fail to parse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Collect every malformed record, then fail the run before accumulating.
    #[default]
    Abort,
    /// Log each malformed record and leave it out.
    Skip,
}

fn default_output_destination() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DESTINATION)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnnConfig {
    /// File, directory or glob pattern of `identifier,x,y` records.
    pub points_source: String,
    pub query_x: f64,
    pub query_y: f64,
    pub k: i64,
    #[serde(default = "default_output_destination")]
    pub output_destination: PathBuf,
    #[serde(default)]
    pub exec: ExecMode,
    #[serde(default)]
    pub reduction: Reduction,
    #[serde(default)]
    pub on_malformed: MalformedPolicy,
}

impl KnnConfig {
    pub fn new<S: Into<String>>(points_source: S, query_x: f64, query_y: f64, k: i64) -> Self {
        Self {
            points_source: points_source.into(),
            query_x,
            query_y,
            k,
            output_destination: default_output_destination(),
            exec: ExecMode::default(),
            reduction: Reduction::default(),
            on_malformed: MalformedPolicy::default(),
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    /// Fails if the file cannot be read or does not describe a `KnnConfig`
    /// (a missing `k` or query coordinate included).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open config {}", path.display()))?;
        serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config {}", path.display()))
    }

    /// Check everything that can be checked before touching the input.
    ///
    /// # Errors
    /// [`KnnError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<QueryPoint, KnnError> {
        if self.points_source.trim().is_empty() {
            return Err(KnnError::config("points_source", "must not be empty"));
        }
        if self.output_destination.as_os_str().is_empty() {
            return Err(KnnError::config("output_destination", "must not be empty"));
        }
        if let ExecMode::Parallel {
            threads,
            partitions,
        } = self.exec
        {
            if threads == Some(0) {
                return Err(KnnError::config("exec.threads", "must be positive"));
            }
            if partitions == Some(0) {
                return Err(KnnError::config("exec.partitions", "must be positive"));
            }
        }
        QueryPoint::new(self.query_x, self.query_y, self.k)
    }
}
