//! The two combiners a nearest-neighbour run folds through.
//!
//! - [`SumDistances`]: the grouping step. Sums every partial distance routed
//!   to one identifier.
//! - [`NearestK`]: the reduction step. Folds candidates into a
//!   [`BoundedTopK`] and finishes with the ascending drain.

use crate::candidate::Candidate;
use crate::collection::CombineFn;
use crate::finalizer::finalize;
use crate::topk::BoundedTopK;
use anyhow::Result;
use std::num::NonZeroUsize;

/// Per-identifier distance sum.
///
/// With unique identifiers every group has one value and this is the
/// identity. If an identifier occurs on several records their distances are
/// added, and the sum is what gets ranked.
#[derive(Clone, Copy, Debug, Default)]
pub struct SumDistances;

impl CombineFn<f64, f64, f64> for SumDistances {
    fn create(&self) -> f64 {
        0.0
    }

    fn add_input(&self, acc: &mut f64, v: f64) -> Result<()> {
        *acc += v;
        Ok(())
    }

    fn merge(&self, acc: &mut f64, other: f64) -> Result<()> {
        *acc += other;
        Ok(())
    }

    fn finish(&self, acc: f64) -> Result<f64> {
        Ok(acc)
    }
}

/// Bounded top-k reduction over candidates.
///
/// Every call to `create` yields a fresh, empty accumulator, so a retried or
/// repeated execution starts from nothing and replays its whole input.
#[derive(Clone, Copy, Debug)]
pub struct NearestK {
    k: NonZeroUsize,
}

impl NearestK {
    pub fn new(k: NonZeroUsize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k.get()
    }
}

impl CombineFn<Candidate, BoundedTopK, Vec<Candidate>> for NearestK {
    fn create(&self) -> BoundedTopK {
        BoundedTopK::with_capacity(self.k)
    }

    fn add_input(&self, acc: &mut BoundedTopK, v: Candidate) -> Result<()> {
        acc.observe(v)?;
        Ok(())
    }

    fn merge(&self, acc: &mut BoundedTopK, other: BoundedTopK) -> Result<()> {
        acc.merge(other)?;
        Ok(())
    }

    fn finish(&self, mut acc: BoundedTopK) -> Result<Vec<Candidate>> {
        Ok(finalize(&mut acc)?)
    }
}
