//! End-to-end composition of a nearest-neighbour run.
//!
//! A run is three pipeline stages:
//!
//! 1. **emit**: every record is parsed and measured against the query. This
//!    stage is element-wise and runs on as many partitions as the runner
//!    allows. Its output is materialised and checked, so malformed input stops
//!    the run before anything is accumulated.
//! 2. **group**: candidates are keyed by identifier and summed
//!    ([`SumDistances`]), which puts every identifier in exactly one place.
//! 3. **reduce**: all grouped candidates are folded by [`NearestK`] and
//!    drained in ascending order.

use crate::candidate::{Candidate, CandidateEmitter};
use crate::collection::from_vec;
use crate::combiners::{NearestK, SumDistances};
use crate::config::{KnnConfig, MalformedPolicy, QueryPoint};
use crate::error::{KnnError, ParseError, RecordLocation};
use crate::finalizer::KnnReport;
use crate::io::{SourceLine, read_records};
use crate::pipeline::Pipeline;
use crate::runner::{ExecMode, Reduction, Runner};
use anyhow::{Context, Result};
use log::{debug, info, warn};

/// Counters describing one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub records: usize,
    pub malformed_skipped: usize,
    pub distinct_ids: usize,
}

impl RunStats {
    /// Records whose distance was added to an identifier seen on another record.
    pub fn summed_records(&self) -> usize {
        self.records - self.malformed_skipped - self.distinct_ids
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KnnRun {
    pub report: KnnReport,
    pub stats: RunStats,
}

/// A validated query plus how to execute it.
pub struct KnnJob {
    query: QueryPoint,
    runner: Runner,
    reduction: Reduction,
    on_malformed: MalformedPolicy,
}

impl KnnJob {
    pub fn new(query: QueryPoint) -> Self {
        Self {
            query,
            runner: Runner::default(),
            reduction: Reduction::default(),
            on_malformed: MalformedPolicy::default(),
        }
    }

    /// Build a job from a configuration, validating it first.
    ///
    /// # Errors
    /// [`KnnError::Config`] for an invalid configuration.
    pub fn from_config(config: &KnnConfig) -> Result<Self, KnnError> {
        Ok(Self::new(config.validate()?)
            .exec(config.exec)
            .reduction(config.reduction)
            .on_malformed(config.on_malformed))
    }

    pub fn exec(mut self, mode: ExecMode) -> Self {
        self.runner = Runner::new(mode);
        self
    }

    pub fn reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn on_malformed(mut self, policy: MalformedPolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    pub fn query(&self) -> &QueryPoint {
        &self.query
    }

    /// Run over raw records.
    ///
    /// Every call builds its pipelines and accumulators from scratch, so
    /// calling it again on the same records gives the same report.
    ///
    /// # Errors
    /// [`KnnError::MalformedRecords`] under [`MalformedPolicy::Abort`], or any
    /// engine failure.
    pub fn run(&self, records: Vec<SourceLine>) -> Result<KnnRun> {
        let mut stats = RunStats {
            records: records.len(),
            ..RunStats::default()
        };

        let candidates = self.emit(records)?;
        stats.malformed_skipped = stats.records - candidates.len();

        let grouped = self.group(candidates)?;
        stats.distinct_ids = grouped.len();
        if stats.summed_records() > 0 {
            debug!(
                "{} record(s) shared an identifier with an earlier record; their distances were summed",
                stats.summed_records()
            );
        }

        let neighbors = self.reduce(grouped)?;
        info!(
            "{} nearest of {} point(s) to ({}, {}) selected",
            neighbors.len(),
            stats.distinct_ids,
            self.query.coords().x,
            self.query.coords().y
        );

        Ok(KnnRun {
            report: KnnReport {
                query: self.query,
                neighbors,
            },
            stats,
        })
    }

    fn emit(&self, records: Vec<SourceLine>) -> Result<Vec<Candidate>> {
        let p = Pipeline::default();
        let emitter = CandidateEmitter::new(self.query.coords());
        let emitted = from_vec(&p, records)
            .map(move |rec: &SourceLine| emitter.emit_located(rec))
            .collect_with(&self.runner)
            .context("emit candidates")?;

        let mut candidates = Vec::with_capacity(emitted.len());
        let mut malformed: Vec<ParseError> = Vec::new();
        for r in emitted {
            match r {
                Ok(c) => candidates.push(c),
                Err(e) => malformed.push(e),
            }
        }

        if !malformed.is_empty() {
            match self.on_malformed {
                MalformedPolicy::Abort => return Err(KnnError::malformed(malformed).into()),
                MalformedPolicy::Skip => {
                    for e in &malformed {
                        warn!("skipping malformed record: {e}");
                    }
                }
            }
        }
        Ok(candidates)
    }

    fn group(&self, candidates: Vec<Candidate>) -> Result<Vec<Candidate>> {
        let p = Pipeline::default();
        from_vec(&p, candidates)
            .map(|c: &Candidate| (c.id.clone(), c.distance))
            .combine_values(SumDistances)
            .map(|(id, distance): &(String, f64)| Candidate::new(id.clone(), *distance))
            .collect_with(&self.runner)
            .context("group candidates by identifier")
    }

    fn reduce(&self, grouped: Vec<Candidate>) -> Result<Vec<Candidate>> {
        let p = Pipeline::default();
        let mut out = from_vec(&p, grouped)
            .combine_globally(NearestK::new(self.query.capacity()), self.reduction)
            .collect_with(&self.runner)
            .context("select nearest candidates")?;
        Ok(out.pop().unwrap_or_default())
    }
}

/// Read the configured source and run the query over it.
///
/// The configuration is validated before any input is read.
///
/// # Errors
/// Configuration, input or parse failures; see [`KnnJob::run`].
pub fn run_knn(config: &KnnConfig) -> Result<KnnRun> {
    let job = KnnJob::from_config(config)?;
    let records = read_records(&config.points_source)
        .with_context(|| format!("read points from {}", config.points_source))?;
    job.run(records)
}

/// Run over in-memory `identifier,x,y` lines, numbering them from 1.
///
/// # Errors
/// See [`KnnJob::run`].
pub fn nearest_in_lines(job: &KnnJob, lines: &[&str]) -> Result<Vec<Candidate>> {
    let records = lines
        .iter()
        .enumerate()
        .map(|(i, text)| SourceLine {
            location: RecordLocation {
                source: "<memory>".into(),
                line_no: i + 1,
            },
            text: (*text).to_string(),
        })
        .collect();
    Ok(job.run(records)?.report.neighbors)
}
