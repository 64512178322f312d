use std::fmt::Debug;

use crate::data::DoubleVector;
use crate::id::ObjectId;

/// Values that can be stored in a relation of a database.
///
/// Vector-like values report their dimensionality so a relation can reject
/// values that do not fit its declared type before anything is written.
pub trait RelationValue: Clone + Debug + Send + Sync + 'static {
    fn dimensionality(&self) -> Option<usize> {
        None
    }
}

impl RelationValue for DoubleVector {
    fn dimensionality(&self) -> Option<usize> {
        Some(DoubleVector::dimensionality(self))
    }
}

impl RelationValue for Vec<f64> {
    fn dimensionality(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl RelationValue for ObjectId {}
impl RelationValue for String {}
impl RelationValue for i64 {}
impl RelationValue for u64 {}
impl RelationValue for f64 {}
impl RelationValue for bool {}
