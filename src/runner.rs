//! Execution of a planned pipeline, sequentially or on a Rayon pool.
//!
//! Parallel execution splits the source into contiguous partitions, runs the
//! fused stateless stage on every partition independently, and collapses to a
//! single partition at each barrier. Nothing a stage computes is kept between
//! runs, so executing the same pipeline again recomputes everything from the
//! source.

use crate::node::{DynOp, Node, Partition, downcast_partition};
use crate::pipeline::{NodeId, Pipeline};
use crate::planner::build_plan;
use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecMode {
    Sequential,
    Parallel {
        threads: Option<usize>,
        partitions: Option<usize>,
    },
}

impl Default for ExecMode {
    fn default() -> Self {
        ExecMode::Parallel {
            threads: None,
            partitions: None,
        }
    }
}

/// How a global combine distributes its fold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Every partition is handed to one accumulator, which folds the whole
    /// input sequentially.
    #[default]
    SingleInstance,
    /// One accumulator per partition, folded together by `CombineFn::merge`.
    /// Only equivalent to `SingleInstance` when the combiner's merge is
    /// associative and order-insensitive.
    PartitionedMerge,
}

pub struct Runner {
    pub mode: ExecMode,
    pub default_partitions: usize,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(ExecMode::default())
    }
}

impl Runner {
    pub fn new(mode: ExecMode) -> Self {
        Self {
            mode,
            default_partitions: 2 * num_cpus::get().max(2),
        }
    }

    /// Plan and execute the chain ending at `terminal`, materialising its output.
    ///
    /// # Errors
    /// Fails on planning errors, a stage failure or a terminal type mismatch.
    pub fn run_collect<T: 'static + Send + Sync>(&self, p: &Pipeline, terminal: NodeId) -> Result<Vec<T>> {
        let plan = build_plan(p, terminal)?;
        debug!(
            "plan for node {}: {} ({} barrier(s), {:?})",
            terminal.raw(),
            plan.describe().join(" => "),
            plan.barriers(),
            plan.optimizations
        );

        match self.mode {
            ExecMode::Sequential => exec_seq(plan.chain),
            ExecMode::Parallel {
                threads,
                partitions,
            } => {
                let parts = partitions.unwrap_or(self.default_partitions);
                if parts == 0 {
                    bail!("partition count must be positive");
                }
                match threads {
                    Some(0) => bail!("thread count must be positive"),
                    Some(t) => {
                        let pool = rayon::ThreadPoolBuilder::new()
                            .num_threads(t)
                            .build()
                            .context("build rayon thread pool")?;
                        pool.install(|| exec_parallel(plan.chain, parts))
                    }
                    None => exec_parallel(plan.chain, parts),
                }
            }
        }
    }
}

fn fuse_stateless(ops: &[Arc<dyn DynOp>], input: Partition) -> Result<Partition> {
    ops.iter().try_fold(input, |acc, op| op.apply(acc))
}

fn exec_seq<T: 'static + Send + Sync>(plan: Vec<Node>) -> Result<Vec<T>> {
    let mut buf: Option<Partition> = None;

    for node in plan {
        let next = match node {
            Node::Source {
                payload, vec_ops, ..
            } => vec_ops
                .clone_any(payload.as_ref())
                .ok_or_else(|| anyhow!("source payload does not match its element type"))?,
            Node::Stateless(ops) => fuse_stateless(&ops, take_input(&mut buf)?)?,
            Node::CombineValues { local, merge } => {
                debug!("combine_values: single partition");
                merge(vec![local(take_input(&mut buf)?)?])?
            }
            Node::CombineGlobal {
                local, merge, finish, ..
            } => {
                debug!("combine_globally: single instance");
                finish(merge(vec![local(take_input(&mut buf)?)?])?)?
            }
        };
        buf = Some(next);
    }

    downcast_partition(take_input(&mut buf)?, "terminal")
}

fn take_input(buf: &mut Option<Partition>) -> Result<Partition> {
    buf.take().ok_or_else(|| anyhow!("stage has no input"))
}

fn exec_parallel<T: 'static + Send + Sync>(plan: Vec<Node>, partitions: usize) -> Result<Vec<T>> {
    let mut nodes = plan.into_iter();
    let Some(Node::Source {
        payload, vec_ops, ..
    }) = nodes.next()
    else {
        bail!("plan must start with a source");
    };

    let total = vec_ops.len(payload.as_ref()).unwrap_or(0);
    let parts = partitions.min(total.max(1));
    let mut current: Vec<Partition> = vec_ops
        .split(payload.as_ref(), parts)
        .ok_or_else(|| anyhow!("source payload does not match its element type"))?;
    debug!("source of {total} element(s) split into {} partition(s)", current.len());

    for node in nodes {
        current = match node {
            Node::Stateless(ops) => current
                .into_par_iter()
                .map(|chunk| fuse_stateless(&ops, chunk))
                .collect::<Result<Vec<_>>>()?,
            Node::CombineValues { local, merge } => {
                let locals = current
                    .into_par_iter()
                    .map(|chunk| local(chunk))
                    .collect::<Result<Vec<_>>>()?;
                debug!("combine_values: merging {} local map(s)", locals.len());
                vec![merge(locals)?]
            }
            Node::CombineGlobal {
                coalesce,
                local,
                merge,
                finish,
                reduction,
            } => {
                let accs = match reduction {
                    Reduction::SingleInstance => {
                        debug!("combine_globally: coalescing {} partition(s) into one instance", current.len());
                        vec![local(coalesce(current)?)?]
                    }
                    Reduction::PartitionedMerge => {
                        debug!("combine_globally: {} local accumulator(s)", current.len());
                        current
                            .into_par_iter()
                            .map(|chunk| local(chunk))
                            .collect::<Result<Vec<_>>>()?
                    }
                };
                vec![finish(merge(accs)?)?]
            }
            Node::Source { .. } => bail!("unexpected additional source in plan"),
        };
    }

    let mut out = Vec::<T>::new();
    for part in current {
        out.extend(downcast_partition::<Vec<T>>(part, "terminal")?);
    }
    Ok(out)
}
