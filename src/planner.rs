//! Turns a pipeline graph into a linear execution chain.
//!
//! Planning walks back from the terminal node to its source, then fuses every
//! run of adjacent `Stateless` nodes into one so each partition crosses the
//! element-wise section in a single pass. Barriers are kept as they are.

use crate::node::{DynOp, Node};
use crate::pipeline::{NodeId, Pipeline};
use anyhow::{Result, anyhow, bail};
use std::sync::Arc;

/// A linear list of nodes to execute from source to terminal.
pub struct Plan {
    pub chain: Vec<Node>,
    pub optimizations: Vec<OptimizationDecision>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizationDecision {
    /// Adjacent stateless blocks were concatenated.
    FusedStateless {
        blocks_before: usize,
        blocks_after: usize,
        ops_count: usize,
    },
}

impl Plan {
    pub fn barriers(&self) -> usize {
        self.chain.iter().filter(|n| n.is_barrier()).count()
    }

    pub fn describe(&self) -> Vec<String> {
        self.chain.iter().map(Node::describe).collect()
    }
}

/// Build the execution plan for `terminal`.
///
/// # Errors
/// Fails if a node referenced by an edge is missing or the chain does not
/// start at a source.
pub fn build_plan(p: &Pipeline, terminal: NodeId) -> Result<Plan> {
    let (mut nodes, edges) = p.snapshot_graph();

    let mut chain: Vec<Node> = Vec::new();
    let mut cur = terminal;
    loop {
        let n = nodes
            .remove(&cur)
            .ok_or_else(|| anyhow!("missing node {cur:?}"))?;
        chain.push(n);
        match edges.iter().find(|(_, to)| *to == cur) {
            Some((from, _)) => cur = *from,
            None => break,
        }
    }
    chain.reverse();

    if !matches!(chain.first(), Some(Node::Source { .. })) {
        bail!("plan for node {terminal:?} does not start at a source");
    }

    let mut optimizations = Vec::new();
    let (chain, decision) = fuse_stateless(chain);
    optimizations.extend(decision);

    Ok(Plan {
        chain,
        optimizations,
    })
}

fn fuse_stateless(chain: Vec<Node>) -> (Vec<Node>, Option<OptimizationDecision>) {
    let blocks_before = chain
        .iter()
        .filter(|n| matches!(n, Node::Stateless(_)))
        .count();

    let mut out: Vec<Node> = Vec::with_capacity(chain.len());
    for node in chain {
        if let (Node::Stateless(ops), Some(Node::Stateless(acc))) = (&node, out.last_mut()) {
            acc.extend(ops.iter().cloned());
            continue;
        }
        out.push(node);
    }

    let stateless: Vec<&Vec<Arc<dyn DynOp>>> = out
        .iter()
        .filter_map(|n| match n {
            Node::Stateless(ops) => Some(ops),
            _ => None,
        })
        .collect();
    let blocks_after = stateless.len();
    let ops_count = stateless.iter().map(|ops| ops.len()).sum();

    let decision = (blocks_after < blocks_before).then_some(OptimizationDecision::FusedStateless {
        blocks_before,
        blocks_after,
        ops_count,
    });
    (out, decision)
}
