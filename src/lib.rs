//! # IronKnn
//!
//! Exact **k-nearest-neighbour search** over planar point records, run as a
//! small batch pipeline. Given a source of `identifier,x,y` lines, a query
//! position and a count `k`, IronKnn returns the `k` points closest to the
//! query in ascending Euclidean distance.
//!
//! ## Key Features
//!
//! - **Bounded memory** - the reduction never holds more than `k` candidates
//! - **Deterministic ties** - equal distances are ordered by identifier, so the
//!   result does not depend on partitioning, thread count or input order
//! - **Sequential and parallel execution** - the same job runs on one thread or
//!   on a Rayon pool with identical output
//! - **Precise input errors** - malformed records are reported with their file
//!   and line, and either abort the run or are skipped
//!
//! ## Quick Start
//!
//! ```no_run
//! use ironknn::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let config = KnnConfig::new("points.txt", 0.0, 0.0, 3);
//! let run = run_knn(&config)?;
//! print!("{}", run.report);
//! # Ok(())
//! # }
//! ```
//!
//! In-memory records work the same way:
//!
//! ```
//! use ironknn::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let job = KnnJob::new(QueryPoint::new(0.0, 0.0, 2)?);
//! let nearest = nearest_in_lines(&job, &["a,1,0", "b,3,4", "c,0,2"])?;
//! assert_eq!(nearest[0], Candidate::new("a", 1.0));
//! assert_eq!(nearest[1], Candidate::new("c", 2.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! A run is built on a deferred pipeline engine:
//! 1. Transforms on a [`PCollection`] add nodes to a [`Pipeline`] graph
//! 2. The [`planner`] linearises the graph and fuses adjacent element-wise steps
//! 3. The [`runner`] executes the plan, splitting the source into partitions
//!    and collapsing at every barrier
//!
//! The [`job`] module composes three such pipelines: candidates are emitted per
//! record, grouped per identifier with [`SumDistances`], and reduced by
//! [`NearestK`] into a [`BoundedTopK`] that is drained in ascending order by
//! the [`finalizer`].
//!
//! ## Module Overview
//!
//! - [`geometry`] - coordinates and the Euclidean metric
//! - [`record`] - parsing `identifier,x,y` records
//! - [`candidate`] - candidates and the per-record emitter
//! - [`ordering`] - the `(distance, identifier)` ranking and heap strategies
//! - [`topk`] - the bounded top-k accumulator
//! - [`finalizer`] - ascending drain, k-way merge and the report
//! - [`combiners`] - the [`CombineFn`]s a run folds through
//! - [`config`] - run configuration and validation
//! - [`io`] - points sources and report output
//! - [`job`] - end-to-end composition
//! - [`collection`], [`pipeline`], [`planner`], [`runner`], [`node`] - the engine

pub mod candidate;
pub mod collection;
pub mod combiners;
pub mod config;
pub mod error;
pub mod finalizer;
pub mod geometry;
pub mod io;
pub mod job;
pub mod node;
pub mod ordering;
pub mod pipeline;
pub mod planner;
pub mod record;
pub mod runner;
pub mod topk;

// Engine
pub use collection::{CombineFn, ElemBound, PCollection, from_vec};
pub use pipeline::{NodeId, Pipeline};
pub use planner::{OptimizationDecision, Plan, build_plan};
pub use runner::{ExecMode, Reduction, Runner};

// Nearest-neighbour search
pub use candidate::{Candidate, CandidateEmitter};
pub use combiners::{NearestK, SumDistances};
pub use config::{DEFAULT_OUTPUT_DESTINATION, KnnConfig, MalformedPolicy, QueryPoint};
pub use error::{ConfigError, KnnError, ParseError, ParseErrorKind, RecordLocation};
pub use finalizer::{KnnReport, finalize, format_real, merge_ascending};
pub use geometry::{Coordinates, euclidean_distance};
pub use io::{REPORT_FILE_NAME, SourceLine, read_records, write_report};
pub use job::{KnnJob, KnnRun, RunStats, nearest_in_lines, run_knn};
pub use ordering::rank;
pub use record::{Point, parse_record};
pub use topk::{AccumulatorState, Admission, BoundedTopK};
