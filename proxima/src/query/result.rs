use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::{Display, Formatter};

use crate::id::ObjectId;

/// One entry of a query answer: a stored object and its distance to the query.
///
/// Pairs are totally ordered by distance (through [`f64::total_cmp`]) and then
/// by id, which is the order every query answer is returned in.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceResultPair {
    distance: f64,
    id: ObjectId,
}

impl DistanceResultPair {
    pub fn new(distance: f64, id: ObjectId) -> Self {
        DistanceResultPair { distance, id }
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl PartialEq for DistanceResultPair {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DistanceResultPair {}

impl PartialOrd for DistanceResultPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistanceResultPair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl Display for DistanceResultPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.id, self.distance)
    }
}

/// Sorted answer of a kNN, range or RkNN query.
pub type QueryResult = Vec<DistanceResultPair>;

/// Bounded max-heap keeping the `k` smallest pairs seen so far.
#[derive(Debug, Clone)]
pub struct KnnHeap {
    k: usize,
    heap: BinaryHeap<DistanceResultPair>,
}

impl KnnHeap {
    pub fn new(k: usize) -> Self {
        KnnHeap {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// Distance a candidate must not exceed to possibly enter the heap.
    ///
    /// Infinite until `k` candidates have been collected.
    pub fn kth_distance(&self) -> f64 {
        if self.k == 0 {
            return f64::NEG_INFINITY;
        }
        match self.heap.peek() {
            Some(top) if self.is_full() => top.distance(),
            _ => f64::INFINITY,
        }
    }

    /// Offers a candidate; returns whether it was kept.
    pub fn insert(&mut self, pair: DistanceResultPair) -> bool {
        if self.k == 0 {
            return false;
        }
        if !self.is_full() {
            self.heap.push(pair);
            return true;
        }
        match self.heap.peek() {
            Some(top) if pair < *top => {
                self.heap.pop();
                self.heap.push(pair);
                true
            }
            _ => false,
        }
    }

    pub fn offer(&mut self, distance: f64, id: ObjectId) -> bool {
        self.insert(DistanceResultPair::new(distance, id))
    }

    /// Consumes the heap, returning its pairs in ascending order.
    pub fn into_sorted_vec(self) -> QueryResult {
        self.heap.into_sorted_vec()
    }
}

/// Sorts a result in place into answer order.
pub(crate) fn sort_result(result: &mut QueryResult) {
    result.sort_unstable();
}
