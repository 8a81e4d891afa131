//! Named ranking strategies for candidates.
//!
//! Candidates are ranked by the total order `(distance, id)`: distance first
//! under [`OrderedFloat`]'s total order, then the identifier
//! lexicographically. The identifier makes ties at equal distance resolve the
//! same way whatever the arrival order, which is what keeps the bounded top-k
//! result reproducible across partitionings and retries.
//!
//! [`BinaryHeap`](std::collections::BinaryHeap) always pops its greatest
//! element, so the strategies differ only in which end of that order they
//! call "greatest":
//!
//! - [`FarthestFirst`]: the farthest candidate is greatest. Used by the
//!   accumulator, whose heap top is the eviction victim.
//! - [`NearestFirst`]: the nearest candidate is greatest. Used when draining
//!   into ascending output.

use crate::candidate::Candidate;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// Ascending rank of two candidates: `Less` means `a` is nearer.
pub fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    OrderedFloat(a.distance)
        .cmp(&OrderedFloat(b.distance))
        .then_with(|| a.id.cmp(&b.id))
}

/// A heap ordering over candidates.
pub trait RankOrder: Send + Sync + 'static {
    /// `Greater` means `a` is popped before `b`.
    fn compare(a: &Candidate, b: &Candidate) -> Ordering;
}

pub struct FarthestFirst;

impl RankOrder for FarthestFirst {
    fn compare(a: &Candidate, b: &Candidate) -> Ordering {
        rank(a, b)
    }
}

pub struct NearestFirst;

impl RankOrder for NearestFirst {
    fn compare(a: &Candidate, b: &Candidate) -> Ordering {
        rank(b, a)
    }
}

/// A candidate ordered by the strategy `O`.
pub struct Ranked<O> {
    candidate: Candidate,
    _order: PhantomData<O>,
}

impl<O: RankOrder> Ranked<O> {
    pub fn new(candidate: Candidate) -> Self {
        Self {
            candidate,
            _order: PhantomData,
        }
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    pub fn into_candidate(self) -> Candidate {
        self.candidate
    }
}

impl<O> Clone for Ranked<O> {
    fn clone(&self) -> Self {
        Self {
            candidate: self.candidate.clone(),
            _order: PhantomData,
        }
    }
}

impl<O> fmt::Debug for Ranked<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ranked").field(&self.candidate).finish()
    }
}

impl<O: RankOrder> PartialEq for Ranked<O> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<O: RankOrder> Eq for Ranked<O> {}

impl<O: RankOrder> PartialOrd for Ranked<O> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<O: RankOrder> Ord for Ranked<O> {
    fn cmp(&self, other: &Self) -> Ordering {
        O::compare(&self.candidate, &other.candidate)
    }
}
