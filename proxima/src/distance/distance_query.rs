use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::distance::{DistanceFunction, SimilarityFunction};
use crate::errors::ProximaResult;
use crate::id::ObjectId;
use crate::relation::{RelationId, RelationRef};

/// A distance function bound to one relation.
///
/// The binding is immutable and never writes to the relation. Cloning shares
/// the binding.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use proxima::common::TypeInformation;
/// use proxima::data::DoubleVector;
/// use proxima::distance::{DistanceQuery, EuclideanDistance};
/// use proxima::id::ObjectId;
/// use proxima::relation::MaterializedRelation;
///
/// let relation = Arc::new(MaterializedRelation::new(
///     "points",
///     TypeInformation::of::<DoubleVector>(),
/// ));
/// relation.set(ObjectId::new(1), DoubleVector::from([0.0, 0.0])).unwrap();
/// relation.set(ObjectId::new(2), DoubleVector::from([3.0, 4.0])).unwrap();
///
/// let query: DistanceQuery<DoubleVector> =
///     DistanceQuery::new(relation, Arc::new(EuclideanDistance));
/// assert_eq!(query.distance(ObjectId::new(1), ObjectId::new(2)).unwrap(), 5.0);
/// ```
pub struct DistanceQuery<O> {
    inner: Arc<DistanceQueryInner<O>>,
}

struct DistanceQueryInner<O> {
    relation: RelationRef<O>,
    function: Arc<dyn DistanceFunction<O>>,
}

impl<O> Clone for DistanceQuery<O> {
    fn clone(&self) -> Self {
        DistanceQuery {
            inner: self.inner.clone(),
        }
    }
}

impl<O> DistanceQuery<O> {
    pub fn new(relation: RelationRef<O>, function: Arc<dyn DistanceFunction<O>>) -> Self {
        DistanceQuery {
            inner: Arc::new(DistanceQueryInner { relation, function }),
        }
    }

    pub fn relation(&self) -> &RelationRef<O> {
        &self.inner.relation
    }

    pub fn relation_id(&self) -> RelationId {
        self.inner.relation.relation_id()
    }

    pub fn function(&self) -> &Arc<dyn DistanceFunction<O>> {
        &self.inner.function
    }

    /// Descriptor of the bound function.
    pub fn descriptor(&self) -> String {
        self.inner.function.descriptor()
    }

    /// Distance between two stored objects.
    pub fn distance(&self, a: ObjectId, b: ObjectId) -> ProximaResult<f64> {
        let first = self.inner.relation.get(a)?;
        let second = self.inner.relation.get(b)?;
        Ok(self.inner.function.distance(&first, &second))
    }

    /// Distance between a query object and a stored object.
    pub fn distance_to(&self, object: &O, id: ObjectId) -> ProximaResult<f64> {
        let stored = self.inner.relation.get(id)?;
        Ok(self.inner.function.distance(object, &stored))
    }

    /// Distance between two arbitrary objects.
    pub fn distance_between(&self, a: &O, b: &O) -> f64 {
        self.inner.function.distance(a, b)
    }

    /// The value no real distance exceeds.
    pub fn infinite_distance(&self) -> f64 {
        f64::INFINITY
    }
}

impl<O> Debug for DistanceQuery<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceQuery")
            .field("relation", &self.inner.relation.relation_id())
            .field("function", &self.inner.function.descriptor())
            .finish()
    }
}

/// A similarity function bound to one relation.
pub struct SimilarityQuery<O> {
    inner: Arc<SimilarityQueryInner<O>>,
}

struct SimilarityQueryInner<O> {
    relation: RelationRef<O>,
    function: Arc<dyn SimilarityFunction<O>>,
}

impl<O> Clone for SimilarityQuery<O> {
    fn clone(&self) -> Self {
        SimilarityQuery {
            inner: self.inner.clone(),
        }
    }
}

impl<O> SimilarityQuery<O> {
    pub fn new(relation: RelationRef<O>, function: Arc<dyn SimilarityFunction<O>>) -> Self {
        SimilarityQuery {
            inner: Arc::new(SimilarityQueryInner { relation, function }),
        }
    }

    pub fn relation(&self) -> &RelationRef<O> {
        &self.inner.relation
    }

    pub fn function(&self) -> &Arc<dyn SimilarityFunction<O>> {
        &self.inner.function
    }

    pub fn similarity(&self, a: ObjectId, b: ObjectId) -> ProximaResult<f64> {
        let first = self.inner.relation.get(a)?;
        let second = self.inner.relation.get(b)?;
        Ok(self.inner.function.similarity(&first, &second))
    }

    pub fn similarity_to(&self, object: &O, id: ObjectId) -> ProximaResult<f64> {
        let stored = self.inner.relation.get(id)?;
        Ok(self.inner.function.similarity(object, &stored))
    }
}

impl<O> Debug for SimilarityQuery<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityQuery")
            .field("relation", &self.inner.relation.relation_id())
            .field("function", &self.inner.function.descriptor())
            .finish()
    }
}
