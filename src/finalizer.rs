//! Turning accumulated candidates into the final ascending report.

use crate::candidate::Candidate;
use crate::config::QueryPoint;
use crate::error::KnnError;
use crate::ordering::{NearestFirst, Ranked};
use crate::topk::BoundedTopK;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

/// Drain `acc` into ascending distance order.
///
/// The accumulator yields farthest first, so its contents are moved into a
/// [`NearestFirst`] heap and popped from there.
///
/// # Errors
/// [`KnnError::AccumulatorDrained`] if `acc` was already drained.
pub fn finalize(acc: &mut BoundedTopK) -> Result<Vec<Candidate>, KnnError> {
    let drain = acc.drain()?;
    let mut nearest: BinaryHeap<Ranked<NearestFirst>> = BinaryHeap::with_capacity(drain.len());
    for candidate in drain {
        nearest.push(Ranked::new(candidate));
    }

    let mut out = Vec::with_capacity(nearest.len());
    while let Some(r) = nearest.pop() {
        out.push(r.into_candidate());
    }
    Ok(out)
}

/// k-way merge of ascending runs, keeping the first `k` overall.
///
/// Each run must already be ascending under [`rank`](crate::ordering::rank).
pub fn merge_ascending(runs: Vec<Vec<Candidate>>, k: usize) -> Vec<Candidate> {
    let total: usize = runs.iter().map(Vec::len).sum();
    let mut runs: Vec<_> = runs.into_iter().map(Vec::into_iter).collect();

    let mut heads: BinaryHeap<(Ranked<NearestFirst>, Reverse<usize>)> = BinaryHeap::with_capacity(runs.len());
    for (i, run) in runs.iter_mut().enumerate() {
        if let Some(c) = run.next() {
            heads.push((Ranked::new(c), Reverse(i)));
        }
    }

    let mut out = Vec::with_capacity(k.min(total));
    while out.len() < k {
        let Some((head, Reverse(i))) = heads.pop() else {
            break;
        };
        out.push(head.into_candidate());
        if let Some(c) = runs[i].next() {
            heads.push((Ranked::new(c), Reverse(i)));
        }
    }
    out
}

/// The result of one run: the query and its nearest points, ascending.
#[derive(Clone, Debug, PartialEq)]
pub struct KnnReport {
    pub query: QueryPoint,
    pub neighbors: Vec<Candidate>,
}

impl KnnReport {
    pub fn header(&self) -> String {
        format!(
            "The {} nearest points to query point ({}, {}) are:",
            self.query.k(),
            format_real(self.query.coords().x),
            format_real(self.query.coords().y)
        )
    }
}

/// Shortest round-trip digits in positional notation, always with a
/// fractional part: `5.0`, `0.00001`, `100000000000000000000.0`.
pub fn format_real(v: f64) -> String {
    let s = v.to_string();
    if !v.is_finite() || s.contains('.') {
        s
    } else {
        s + ".0"
    }
}

impl fmt::Display for KnnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        for c in &self.neighbors {
            writeln!(f, "{}\t{}", c.id, format_real(c.distance))?;
        }
        Ok(())
    }
}
