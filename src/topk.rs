//! Fixed-capacity selection of the k nearest candidates.
//!
//! [`BoundedTopK`] keeps a max-heap ordered by [`FarthestFirst`], so the
//! current worst resident is always at the top: admission and eviction are
//! `O(log k)`, rejection is `O(1)`. The set is strictly bounded by `k` and is
//! drained exactly once.
//!
//! ```text
//! Empty -> Filling (len < k) -> Full (len == k) --evict--> Full
//!   \________________\______________\___drain()__> Draining -> Drained
//! ```

use crate::candidate::Candidate;
use crate::config::positive_capacity;
use crate::error::KnnError;
use crate::finalizer::merge_ascending;
use crate::ordering::{FarthestFirst, Ranked, rank};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::num::NonZeroUsize;

// Large `k` values are legal; only reserve up front for typical ones.
const PREALLOCATE_LIMIT: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumulatorState {
    Empty,
    Filling,
    Full,
    Draining,
    Drained,
}

/// What [`BoundedTopK::observe`] did with a candidate.
#[derive(Clone, Debug, PartialEq)]
pub enum Admission {
    /// Stored without evicting anything (the set was below capacity).
    Inserted,
    /// Stored in place of the previous farthest resident.
    Replaced { evicted: Candidate },
    /// Not nearer than the farthest resident of a full set.
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Accepting,
    Draining,
    Drained,
}

#[derive(Debug)]
pub struct BoundedTopK {
    heap: BinaryHeap<Ranked<FarthestFirst>>,
    capacity: NonZeroUsize,
    phase: Phase,
}

impl BoundedTopK {
    /// Create an empty set holding at most `k` candidates.
    ///
    /// # Errors
    /// [`KnnError::Config`] if `k <= 0`.
    pub fn new(k: i64) -> Result<Self, KnnError> {
        Ok(Self::with_capacity(positive_capacity(k)?))
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity.get().min(PREALLOCATE_LIMIT)),
            capacity,
            phase: Phase::Accepting,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn state(&self) -> AccumulatorState {
        match self.phase {
            Phase::Draining => AccumulatorState::Draining,
            Phase::Drained => AccumulatorState::Drained,
            Phase::Accepting if self.heap.is_empty() => AccumulatorState::Empty,
            Phase::Accepting if self.heap.len() < self.capacity.get() => AccumulatorState::Filling,
            Phase::Accepting => AccumulatorState::Full,
        }
    }

    /// The resident a new candidate has to beat, once the set is full.
    pub fn threshold(&self) -> Option<&Candidate> {
        if self.heap.len() < self.capacity.get() {
            return None;
        }
        self.heap.peek().map(Ranked::candidate)
    }

    fn ensure_accepting(&self) -> Result<(), KnnError> {
        match self.phase {
            Phase::Accepting => Ok(()),
            Phase::Draining | Phase::Drained => Err(KnnError::AccumulatorDrained),
        }
    }

    /// Offer one candidate.
    ///
    /// Below capacity it is always stored. At capacity it replaces the farthest
    /// resident only if it ranks strictly before it; an exact tie in both
    /// distance and identifier keeps the resident.
    ///
    /// # Errors
    /// [`KnnError::AccumulatorDrained`] after a drain has started, and
    /// [`KnnError::Computation`] for a non-finite distance. The set is left
    /// unchanged in both cases.
    pub fn observe(&mut self, candidate: Candidate) -> Result<Admission, KnnError> {
        self.ensure_accepting()?;
        if !candidate.distance.is_finite() {
            return Err(KnnError::Computation {
                id: candidate.id,
                distance: candidate.distance,
            });
        }

        if self.heap.len() < self.capacity.get() {
            self.heap.push(Ranked::new(candidate));
            return Ok(Admission::Inserted);
        }

        match self.heap.peek_mut() {
            Some(mut top) if rank(&candidate, top.candidate()) == Ordering::Less => {
                // PeekMut restores the heap order when `top` goes out of scope.
                let evicted = std::mem::replace(&mut *top, Ranked::new(candidate));
                Ok(Admission::Replaced {
                    evicted: evicted.into_candidate(),
                })
            }
            _ => Ok(Admission::Rejected),
        }
    }

    /// Fold another set into this one, keeping this set's capacity.
    ///
    /// # Errors
    /// [`KnnError::AccumulatorDrained`] if either side has started draining.
    pub fn merge(&mut self, other: BoundedTopK) -> Result<(), KnnError> {
        self.ensure_accepting()?;
        other.ensure_accepting()?;

        let mine = ascending(std::mem::take(&mut self.heap));
        let theirs = ascending(other.heap);
        self.heap = merge_ascending(vec![mine, theirs], self.capacity.get())
            .into_iter()
            .map(Ranked::new)
            .collect();
        Ok(())
    }

    /// Start the one-time drain. Candidates come out farthest first; the set is
    /// `Drained` once the iterator is exhausted or dropped.
    ///
    /// # Errors
    /// [`KnnError::AccumulatorDrained`] if a drain already started.
    pub fn drain(&mut self) -> Result<Drain<'_>, KnnError> {
        self.ensure_accepting()?;
        self.phase = Phase::Draining;
        Ok(Drain { acc: self })
    }
}

fn ascending(heap: BinaryHeap<Ranked<FarthestFirst>>) -> Vec<Candidate> {
    heap.into_sorted_vec()
        .into_iter()
        .map(Ranked::into_candidate)
        .collect()
}

/// Farthest-first iterator over a draining [`BoundedTopK`].
pub struct Drain<'a> {
    acc: &'a mut BoundedTopK,
}

impl Iterator for Drain<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let next = self.acc.heap.pop().map(Ranked::into_candidate);
        if next.is_none() {
            self.acc.phase = Phase::Drained;
        }
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.acc.heap.len();
        (n, Some(n))
    }
}

impl ExactSizeIterator for Drain<'_> {}

impl Drop for Drain<'_> {
    fn drop(&mut self) {
        self.acc.heap.clear();
        self.acc.phase = Phase::Drained;
    }
}
